//! Conversion between domain entities and the wire DTOs of `fanmeet_shared::protocol`.

pub mod conversion;

//! Code shared by the fanmeet relay server and the fanmeet client.
//!
//! - `logger`: tracing subscriber setup used by every binary
//! - `time`: clock abstraction and KST formatting helpers
//! - `protocol`: JSON frames exchanged between the relay and its clients

pub mod logger;
pub mod protocol;
pub mod time;

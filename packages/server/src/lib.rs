//! Signaling relay and session API for fanmeet.
//!
//! The relay is the real-time transport the fanmeet client runs against: it
//! issues connection ids, tracks published streams per session, relays
//! broadcast and unicast signals, and serves the session/recording REST API.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

//! Data Transfer Objects exchanged between the relay and its clients.
//!
//! DTOs are organized by protocol:
//! - `websocket`: relay frames (signals, stream lifecycle)
//! - `http`: REST request/response bodies

pub mod http;
pub mod websocket;

use serde::{Deserialize, Serialize};

/// Role of a participant, declared at connect time and stamped by the relay
/// on every relayed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single privileged participant who drives shared transitions.
    Host,
    #[default]
    Fan,
}

impl Role {
    pub fn is_host(self) -> bool {
        matches!(self, Role::Host)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Fan => "fan",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

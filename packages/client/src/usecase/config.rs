//! Tunables of a session.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Minimum interval between two accepted chat messages
    pub chat_throttle: Duration,
    /// Countdown before each photo shot
    pub countdown: Duration,
    /// How long the capture indicator stays on after a shot
    pub capture_indicator: Duration,
    /// Shots in the photo sequence
    pub photo_shots: u32,
    /// Drop host-scoped signals whose relay-stamped sender is not the host
    pub enforce_host_signals: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_throttle: Duration::from_millis(500),
            countdown: Duration::from_secs(5),
            capture_indicator: Duration::from_millis(1500),
            photo_shots: 4,
            enforce_host_signals: false,
        }
    }
}

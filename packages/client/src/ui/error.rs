//! Error types for the interactive client.

use thiserror::Error;

use crate::domain::SessionError;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Joining the session failed; the client does not retry
    #[error("Failed to join session '{session_id}': {source}")]
    Connect {
        session_id: String,
        source: SessionError,
    },

    #[error("Unknown command '{0}' (type /help)")]
    UnknownCommand(String),

    /// A command was given wrong arguments
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("No participant named '{0}'")]
    UnknownName(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Readline error: {0}")]
    Readline(String),
}

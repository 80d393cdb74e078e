//! Error types of the client core.

use thiserror::Error;

use super::signal::SignalKind;

/// Errors of the real-time transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Another host is already connected to the session (HTTP 409)
    #[error("a host is already connected to this session")]
    HostAlreadyConnected,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("session is full")]
    SessionFull,

    /// The relay refused the upgrade with another status code
    #[error("connection rejected with status {0}")]
    Rejected(u16),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The link is already closed; nothing can be sent
    #[error("transport is closed")]
    Closed,
}

/// Error returned by the REST collaborator: a code + message pair
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors of signal encoding, decoding and dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("unknown signal kind: {0}")]
    UnknownKind(String),

    #[error("a handler for '{0}' is already registered")]
    AlreadyRegistered(SignalKind),

    #[error("'{kind}' may only be sent by the host (sender: {sender})")]
    Unauthorized { kind: SignalKind, sender: String },

    #[error("expected '{expected}' payload, got '{actual}'")]
    KindMismatch {
        expected: SignalKind,
        actual: SignalKind,
    },

    #[error("malformed '{kind}' payload: {reason}")]
    MalformedPayload { kind: SignalKind, reason: String },

    #[error("failed to encode '{kind}' payload: {reason}")]
    Encode { kind: SignalKind, reason: String },
}

/// Errors of chat posting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message is empty")]
    Empty,

    /// Less than the throttle interval passed since the last accepted message
    #[error("sending too fast, retry in {retry_after_ms} ms")]
    Throttled { retry_after_ms: i64 },

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Errors of the photo sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    #[error("photo time has ended")]
    Ended,

    #[error("all {0} shots have been taken")]
    AllShotsTaken(u32),

    #[error("{taken} of {total} shots taken")]
    ShotsRemaining { taken: u32, total: u32 },

    #[error("a countdown is still running")]
    CountdownRunning,

    #[error("no recording is active")]
    NoActiveRecording,

    #[error("no fan is connected")]
    NoFans,
}

/// Errors surfaced by the session connection manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("not connected to a session")]
    NotConnected,

    #[error("already connected to a session")]
    AlreadyConnected,

    #[error("only the host can do this")]
    NotHost,

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}

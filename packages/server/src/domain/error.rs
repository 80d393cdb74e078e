//! Domain errors.

use thiserror::Error;

/// Value Object の生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("session id must not be empty")]
    SessionIdEmpty,

    #[error("session id is too long ({0} bytes)")]
    SessionIdTooLong(usize),

    #[error("session id contains invalid characters: '{0}'")]
    SessionIdInvalidCharacter(String),

    #[error("connection id must not be empty")]
    ConnectionIdEmpty,

    #[error("stream id must not be empty")]
    StreamIdEmpty,

    #[error("recording id must not be empty")]
    RecordingIdEmpty,

    #[error("display name must not be empty")]
    DisplayNameEmpty,

    #[error("display name is too long ({0} characters)")]
    DisplayNameTooLong(usize),
}

/// Session エンティティの不変条件違反
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionDomainError {
    #[error("session is closed")]
    SessionClosed,

    #[error("session capacity exceeded (max: {0})")]
    CapacityExceeded(usize),

    #[error("a host is already connected to this session")]
    HostAlreadyConnected,

    #[error("connection '{0}' is not part of this session")]
    UnknownConnection(String),
}

/// Repository のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("recording not found: {0}")]
    RecordingNotFound(String),

    #[error(transparent)]
    Domain(#[from] SessionDomainError),
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("push failed: {0}")]
    PushFailed(String),
}

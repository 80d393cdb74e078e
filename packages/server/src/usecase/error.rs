//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{RepositoryError, SessionDomainError};

/// 参加者接続のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("a host is already connected to this session")]
    HostAlreadyConnected,

    #[error("session capacity exceeded (max: {0})")]
    CapacityExceeded(usize),
}

impl From<RepositoryError> for ConnectError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::SessionNotFound(id) => Self::SessionNotFound(id),
            RepositoryError::RecordingNotFound(id) => Self::InvalidParameter(id),
            RepositoryError::Domain(SessionDomainError::SessionClosed) => Self::SessionClosed,
            RepositoryError::Domain(SessionDomainError::HostAlreadyConnected) => {
                Self::HostAlreadyConnected
            }
            RepositoryError::Domain(SessionDomainError::CapacityExceeded(max)) => {
                Self::CapacityExceeded(max)
            }
            RepositoryError::Domain(SessionDomainError::UnknownConnection(id)) => {
                Self::InvalidParameter(id)
            }
        }
    }
}

/// 参加者切断のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// シグナル中継のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("signal kind must not be empty")]
    EmptyKind,

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("sender '{0}' is not connected to this session")]
    UnknownSender(String),

    #[error("failed to deliver signal: {0}")]
    DeliveryFailed(String),
}

/// ストリーム公開・購読のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("stream not found: {0}")]
    StreamNotFound(String),

    #[error("stream '{0}' is owned by another connection")]
    NotOwner(String),

    #[error("connection '{0}' is not part of this session")]
    UnknownConnection(String),

    #[error("failed to deliver stream event: {0}")]
    DeliveryFailed(String),
}

impl From<RepositoryError> for StreamError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::SessionNotFound(id) => Self::SessionNotFound(id),
            RepositoryError::Domain(SessionDomainError::UnknownConnection(id)) => {
                Self::UnknownConnection(id)
            }
            other => Self::InvalidStream(other.to_string()),
        }
    }
}

/// セッション操作（開始・取得・クローズ）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),
}

/// 録画のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session is closed: {0}")]
    SessionClosed(String),

    #[error("recording not found: {0}")]
    RecordingNotFound(String),

    #[error("recording already stopped: {0}")]
    AlreadyStopped(String),
}

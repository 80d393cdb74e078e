//! UseCase: セッションのクローズ
//!
//! クローズ後は新しい接続を受け付けない。接続中の参加者への通知はホストが
//! `closeSession` シグナルで行うため、ここでは状態の更新だけを行う。

use std::sync::Arc;

use crate::domain::{RepositoryError, SessionId, SessionRepository};

use super::error::SessionError;

/// セッションクローズのユースケース
pub struct CloseSessionUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl CloseSessionUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, session_id: String) -> Result<(), SessionError> {
        let session_id = SessionId::new(session_id)
            .map_err(|e| SessionError::InvalidSessionId(e.to_string()))?;
        self.repository
            .close_session(&session_id)
            .await
            .map_err(|e| match e {
                RepositoryError::SessionNotFound(id) => SessionError::SessionNotFound(id),
                other => SessionError::SessionNotFound(other.to_string()),
            })?;
        tracing::info!("Session '{}' closed", session_id);
        Ok(())
    }
}

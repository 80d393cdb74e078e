//! UseCase: セッション一覧・詳細の取得（デバッグ用エンドポイント向け）

use std::sync::Arc;

use crate::domain::{RepositoryError, Session, SessionId, SessionRepository};

use super::error::SessionError;

/// セッション取得のユースケース
pub struct GetSessionsUseCase {
    repository: Arc<dyn SessionRepository>,
}

impl GetSessionsUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self { repository }
    }

    /// 全セッションを ID 順で返す
    pub async fn list(&self) -> Vec<Session> {
        self.repository.list_sessions().await
    }

    pub async fn get(&self, session_id: String) -> Result<Session, SessionError> {
        let session_id = SessionId::new(session_id)
            .map_err(|e| SessionError::InvalidSessionId(e.to_string()))?;
        self.repository
            .get_session(&session_id)
            .await
            .map_err(|e| match e {
                RepositoryError::SessionNotFound(id) => SessionError::SessionNotFound(id),
                other => SessionError::SessionNotFound(other.to_string()),
            })
    }
}

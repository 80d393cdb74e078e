//! UseCase: セッション開始
//!
//! 指定された ID のセッションを開き、タイムテーブルを返す。既に開いている
//! セッションに対しては既存のセッションをそのまま返す（冪等）。

use std::sync::Arc;

use fanmeet_shared::time::Clock;

use crate::domain::{Session, SessionId, SessionRepository, Timestamp, TimetableEntry};

use super::error::SessionError;

/// セッション開始のユースケース
pub struct OpenSessionUseCase {
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    /// 新しいセッションに割り当てるタイムテーブル
    timetable: Vec<TimetableEntry>,
    max_participants: usize,
}

impl OpenSessionUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        timetable: Vec<TimetableEntry>,
        max_participants: usize,
    ) -> Self {
        Self {
            repository,
            clock,
            timetable,
            max_participants,
        }
    }

    pub async fn execute(&self, custom_session_id: String) -> Result<Session, SessionError> {
        let session_id = SessionId::new(custom_session_id)
            .map_err(|e| SessionError::InvalidSessionId(e.to_string()))?;

        let session = Session::new(
            session_id,
            self.timetable.clone(),
            self.max_participants,
            Timestamp::new(self.clock.now_millis()),
        );
        let session = self.repository.open_session(session).await;
        tracing::info!(
            "Session '{}' opened ({} corners, {} participants)",
            session.id,
            session.timetable.len(),
            session.connections.len()
        );
        Ok(session)
    }
}

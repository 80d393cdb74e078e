//! InMemory Session Repository 実装
//!
//! ドメイン層が定義する SessionRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。セッションと録画はプロセスの
//! 生存期間中だけ保持されます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, Recording, RecordingId, RepositoryError, Session, SessionId,
    SessionRepository, Stream, StreamId,
};

/// インメモリ Session Repository 実装
#[derive(Default)]
pub struct InMemorySessionRepository {
    /// セッション ID → Session ドメインモデル
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    /// 録画 ID → Recording
    recordings: Mutex<HashMap<RecordingId, Recording>>,
}

impl InMemorySessionRepository {
    /// 新しい InMemorySessionRepository を作成
    pub fn new(sessions: Arc<Mutex<HashMap<SessionId, Session>>>) -> Self {
        Self {
            sessions,
            recordings: Mutex::new(HashMap::new()),
        }
    }

    fn not_found(session_id: &SessionId) -> RepositoryError {
        RepositoryError::SessionNotFound(session_id.as_str().to_string())
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn open_session(&self, session: Session) -> Session {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session.id.clone())
            .or_insert(session)
            .clone()
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<Session, RepositoryError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| Self::not_found(session_id))
    }

    async fn list_sessions(&self) -> Vec<Session> {
        let sessions = self.sessions.lock().await;
        let mut list: Vec<Session> = sessions.values().cloned().collect();
        list.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        list
    }

    async fn add_connection(
        &self,
        session_id: &SessionId,
        connection: Connection,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::not_found(session_id))?;
        session.add_connection(connection)?;
        Ok(())
    }

    async fn remove_connection(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<Stream>, RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::not_found(session_id))?;
        Ok(session.remove_connection(connection_id))
    }

    async fn upsert_stream(
        &self,
        session_id: &SessionId,
        stream: Stream,
    ) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::not_found(session_id))?;
        Ok(session.upsert_stream(stream)?)
    }

    async fn remove_stream(
        &self,
        session_id: &SessionId,
        stream_id: &StreamId,
    ) -> Result<Option<Stream>, RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::not_found(session_id))?;
        Ok(session.remove_stream(stream_id))
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Self::not_found(session_id))?;
        session.close();
        Ok(())
    }

    async fn save_recording(&self, recording: Recording) {
        let mut recordings = self.recordings.lock().await;
        recordings.insert(recording.id.clone(), recording);
    }

    async fn get_recording(&self, recording_id: &RecordingId) -> Result<Recording, RepositoryError> {
        let recordings = self.recordings.lock().await;
        recordings
            .get(recording_id)
            .cloned()
            .ok_or_else(|| RepositoryError::RecordingNotFound(recording_id.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Role, SessionDomainError, Timestamp};

    fn session_id() -> SessionId {
        SessionId::new("fm-1".to_string()).unwrap()
    }

    async fn create_test_repository() -> InMemorySessionRepository {
        let repo = InMemorySessionRepository::default();
        repo.open_session(Session::new(session_id(), vec![], 10, Timestamp::new(0)))
            .await;
        repo
    }

    fn connection(name: &str, role: Role) -> Connection {
        Connection::new(
            DisplayName::new(name.to_string()).unwrap(),
            7,
            role,
            Timestamp::new(1000),
        )
    }

    #[tokio::test]
    async fn test_open_session_is_idempotent() {
        // テスト項目: 同じ ID でセッションを開くと既存のセッションが返される
        // given (前提条件):
        let repo = create_test_repository().await;
        repo.add_connection(&session_id(), connection("alice", Role::Fan))
            .await
            .unwrap();

        // when (操作):
        let reopened = repo
            .open_session(Session::new(session_id(), vec![], 10, Timestamp::new(5)))
            .await;

        // then (期待する結果):
        assert_eq!(reopened.connections.len(), 1);
        assert_eq!(reopened.created_at, Timestamp::new(0));
        assert_eq!(repo.list_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_connection_to_unknown_session() {
        // テスト項目: 存在しないセッションへの接続追加はエラーになる
        // given (前提条件):
        let repo = InMemorySessionRepository::default();

        // when (操作):
        let result = repo
            .add_connection(&session_id(), connection("alice", Role::Fan))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::SessionNotFound("fm-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_add_connection_propagates_domain_error() {
        // テスト項目: ドメインの不変条件違反がそのまま Repository エラーになる
        // given (前提条件):
        let repo = create_test_repository().await;
        repo.add_connection(&session_id(), connection("host", Role::Host))
            .await
            .unwrap();

        // when (操作):
        let result = repo
            .add_connection(&session_id(), connection("host2", Role::Host))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::Domain(
                SessionDomainError::HostAlreadyConnected
            ))
        );
    }

    #[tokio::test]
    async fn test_remove_nonexistent_connection() {
        // テスト項目: 存在しない接続を削除しても問題なく処理される（冪等性）
        // given (前提条件):
        let repo = create_test_repository().await;

        // when (操作):
        let result = repo
            .remove_connection(&session_id(), &ConnectionId::generate())
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_recording_round_trip() {
        // テスト項目: 保存した録画を ID で取得でき、未知の ID はエラーになる
        // given (前提条件):
        let repo = create_test_repository().await;
        let recording = Recording::start(session_id(), Timestamp::new(10));

        // when (操作):
        repo.save_recording(recording.clone()).await;
        let found = repo.get_recording(&recording.id).await;
        let missing = repo.get_recording(&RecordingId::generate()).await;

        // then (期待する結果):
        assert_eq!(found, Ok(recording));
        assert!(matches!(
            missing,
            Err(RepositoryError::RecordingNotFound(_))
        ));
    }
}

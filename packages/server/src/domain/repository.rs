//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    Connection, ConnectionId, Recording, RecordingId, RepositoryError, Session, SessionId,
    Stream, StreamId,
};

/// Session Repository trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
/// セッション状態はすべて揮発性で、プロセス終了とともに消える。
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// セッションを保存する。既に存在する場合は既存のセッションを返す（冪等）。
    async fn open_session(&self, session: Session) -> Session;

    /// セッションを取得
    async fn get_session(&self, session_id: &SessionId) -> Result<Session, RepositoryError>;

    /// 全セッションを取得
    async fn list_sessions(&self) -> Vec<Session>;

    /// 接続を追加
    async fn add_connection(
        &self,
        session_id: &SessionId,
        connection: Connection,
    ) -> Result<(), RepositoryError>;

    /// 接続を削除し、その接続が所有していたストリームを返す
    async fn remove_connection(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<Stream>, RepositoryError>;

    /// ストリームを追加または更新（新規なら true）
    async fn upsert_stream(
        &self,
        session_id: &SessionId,
        stream: Stream,
    ) -> Result<bool, RepositoryError>;

    /// ストリームを削除
    async fn remove_stream(
        &self,
        session_id: &SessionId,
        stream_id: &StreamId,
    ) -> Result<Option<Stream>, RepositoryError>;

    /// セッションをクローズ
    async fn close_session(&self, session_id: &SessionId) -> Result<(), RepositoryError>;

    /// 録画を保存（新規・更新とも）
    async fn save_recording(&self, recording: Recording);

    /// 録画を取得
    async fn get_recording(&self, recording_id: &RecordingId) -> Result<Recording, RepositoryError>;
}

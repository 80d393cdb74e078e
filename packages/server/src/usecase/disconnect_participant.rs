//! UseCase: 参加者切断処理
//!
//! 接続を Session から取り除き、その接続が公開していたストリームごとに
//! `streamDestroyed` を残りの参加者へブロードキャストする。

use std::sync::Arc;

use fanmeet_shared::protocol::websocket::ServerFrame;

use crate::domain::{ConnectionId, MessagePusher, SessionId, SessionRepository};

use super::error::DisconnectError;

/// 切断時の `streamDestroyed.reason`
const REASON_DISCONNECT: &str = "disconnect";

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SessionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - 通知対象となった残りの参加者
    /// * `Err(DisconnectError)` - セッションが存在しない
    pub async fn execute(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, DisconnectError> {
        // 1. MessagePusher から登録解除（以降のフレームは届かない）
        self.message_pusher.unregister_client(connection_id).await;

        // 2. Session から接続と所有ストリームを削除
        let removed_streams = self
            .repository
            .remove_connection(session_id, connection_id)
            .await
            .map_err(|e| DisconnectError::SessionNotFound(e.to_string()))?;

        // 3. 残りの参加者に streamDestroyed を通知
        let remaining: Vec<ConnectionId> = self
            .repository
            .get_session(session_id)
            .await
            .map(|session| session.connections.into_iter().map(|c| c.id).collect())
            .unwrap_or_default();

        for stream in removed_streams {
            let frame = ServerFrame::StreamDestroyed {
                stream_id: stream.id.into_string(),
                connection_id: connection_id.as_str().to_string(),
                reason: REASON_DISCONNECT.to_string(),
            };
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize streamDestroyed: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.message_pusher.broadcast(remaining.clone(), &json).await {
                tracing::warn!("Failed to broadcast streamDestroyed: {}", e);
            }
        }

        tracing::info!(
            "Connection '{}' left session '{}' ({} remaining)",
            connection_id,
            session_id,
            remaining.len()
        );
        Ok(remaining)
    }
}

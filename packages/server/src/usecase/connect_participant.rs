//! UseCase: 参加者接続処理
//!
//! ## 処理の流れ
//!
//! 1. 接続パラメータを Value Object に変換（不正なら InvalidParameter）
//! 2. Session 集約に接続を追加（クローズ済み・定員超過・ホスト重複を拒否）
//! 3. `connected` フレーム（自分の接続情報と公開中のストリーム）を送信キューに積む
//! 4. MessagePusher に送信チャンネルを登録
//!
//! `connected` を登録より先に積むため、新しい参加者が最初に受け取るフレームは
//! 必ず `connected` になる。

use std::sync::Arc;

use fanmeet_shared::{
    protocol::websocket::{ConnectionInfo, ServerFrame},
    time::Clock,
};

use crate::{
    domain::{
        Connection, DisplayName, MessagePusher, PusherChannel, Role, SessionId,
        SessionRepository, Timestamp,
    },
    infrastructure::dto::conversion::stream_info,
};

use super::error::ConnectError;

/// WebSocket 接続時のクエリパラメータ（未検証）
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub session_id: String,
    pub display_name: String,
    pub user_id: u64,
    pub role: Role,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn SessionRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Returns
    ///
    /// * `Ok((SessionId, Connection))` - 接続成功
    /// * `Err(ConnectError)` - 接続失敗（WebSocket のアップグレード前に HTTP ステータスへ変換される）
    pub async fn execute(
        &self,
        request: ConnectRequest,
        sender: PusherChannel,
    ) -> Result<(SessionId, Connection), ConnectError> {
        let session_id = SessionId::new(request.session_id)
            .map_err(|e| ConnectError::InvalidParameter(e.to_string()))?;
        let display_name = DisplayName::new(request.display_name)
            .map_err(|e| ConnectError::InvalidParameter(e.to_string()))?;

        let connection = Connection::new(
            display_name,
            request.user_id,
            request.role,
            Timestamp::new(self.clock.now_millis()),
        );
        self.repository
            .add_connection(&session_id, connection.clone())
            .await?;

        let session = self.repository.get_session(&session_id).await?;
        let frame = ServerFrame::Connected {
            connection: ConnectionInfo::from(&connection),
            streams: session
                .streams
                .iter()
                .filter_map(|stream| stream_info(&session, stream))
                .collect(),
        };
        match serde_json::to_string(&frame) {
            Ok(json) => {
                if sender.send(json).is_err() {
                    tracing::warn!("Connection '{}' dropped before welcome", connection.id);
                }
            }
            Err(e) => tracing::error!("Failed to serialize connected frame: {}", e),
        }

        self.message_pusher
            .register_client(connection.id.clone(), sender)
            .await;

        tracing::info!(
            "'{}' joined session '{}' as {} ({})",
            connection.display_name.as_str(),
            session_id,
            connection.role,
            connection.id
        );
        Ok((session_id, connection))
    }
}

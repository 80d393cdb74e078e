//! UseCase: シグナル中継
//!
//! 送信者の接続情報（表示名・ロールを含む）をリレー側で `from` に刻印して配送する。
//! 宛先指定がなければ送信者自身を含むセッションの全員へ、指定があれば
//! そのうちセッションに参加している接続だけへ届ける。
//! 中継はシグナルの中身を解釈しない。

use std::sync::Arc;

use fanmeet_shared::protocol::websocket::{ConnectionInfo, ServerFrame};

use crate::domain::{ConnectionId, MessagePusher, SessionId, SessionRepository};

use super::error::RelayError;

/// シグナル中継のユースケース
pub struct RelaySignalUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelaySignalUseCase {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// シグナルを中継し、配送先の接続 ID を返す
    pub async fn execute(
        &self,
        session_id: &SessionId,
        from: &ConnectionId,
        kind: String,
        data: serde_json::Value,
        to: Option<Vec<String>>,
    ) -> Result<Vec<ConnectionId>, RelayError> {
        if kind.trim().is_empty() {
            return Err(RelayError::EmptyKind);
        }

        let session = self
            .repository
            .get_session(session_id)
            .await
            .map_err(|_| RelayError::SessionNotFound(session_id.as_str().to_string()))?;
        let sender = session
            .connection(from)
            .ok_or_else(|| RelayError::UnknownSender(from.as_str().to_string()))?;

        let targets: Vec<ConnectionId> = match &to {
            None => session.connections.iter().map(|c| c.id.clone()).collect(),
            Some(ids) => session
                .connections
                .iter()
                .filter(|c| ids.iter().any(|id| id == c.id.as_str()))
                .map(|c| c.id.clone())
                .collect(),
        };

        let frame = ServerFrame::Signal {
            kind,
            data,
            from: ConnectionInfo::from(sender),
        };
        let json = serde_json::to_string(&frame)
            .map_err(|e| RelayError::DeliveryFailed(e.to_string()))?;

        self.message_pusher
            .broadcast(targets.clone(), &json)
            .await
            .map_err(|e| RelayError::DeliveryFailed(e.to_string()))?;

        Ok(targets)
    }
}

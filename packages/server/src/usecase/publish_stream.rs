//! UseCase: ストリームの公開・更新・取り下げ・購読
//!
//! 新しいストリームが公開されると、他の参加者へ `streamCreated` を通知する。
//! 取り下げられたときは `streamDestroyed` を通知する。メディアの送受信そのものは
//! リレーの責務外のため、購読は存在確認だけを行う。

use std::sync::Arc;

use fanmeet_shared::{
    protocol::websocket::{ServerFrame, StreamDescriptor, StreamInfo},
    time::Clock,
};

use crate::{
    domain::{
        ConnectionId, MessagePusher, Session, SessionId, SessionRepository, Stream, StreamId,
        Timestamp,
    },
    infrastructure::dto::conversion::stream_info,
};

use super::error::StreamError;

const REASON_UNPUBLISH: &str = "unpublish";

/// ストリーム操作のユースケース
pub struct PublishStreamUseCase {
    repository: Arc<dyn SessionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl PublishStreamUseCase {
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

    /// ストリームを公開し、他の参加者に `streamCreated` を通知する
    ///
    /// 同じ ID で再公開された場合はフラグの更新として扱い、通知しない。
    pub async fn publish(
        &self,
        session_id: &SessionId,
        owner: &ConnectionId,
        descriptor: StreamDescriptor,
    ) -> Result<StreamInfo, StreamError> {
        let stream_id = StreamId::new(descriptor.stream_id)
            .map_err(|e| StreamError::InvalidStream(e.to_string()))?;
        let session = self.session(session_id).await?;
        Self::ensure_owner(&session, &stream_id, owner)?;

        let stream = Stream {
            id: stream_id,
            owner: owner.clone(),
            audio_active: descriptor.audio_active,
            video_active: descriptor.video_active,
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        let created = self
            .repository
            .upsert_stream(session_id, stream.clone())
            .await?;

        let session = self.session(session_id).await?;
        let info = stream_info(&session, &stream)
            .ok_or_else(|| StreamError::UnknownConnection(owner.as_str().to_string()))?;
        if created {
            tracing::info!("Stream '{}' published by '{}'", stream.id, owner);
            let frame = ServerFrame::StreamCreated {
                stream: info.clone(),
            };
            self.broadcast_except(&session, owner, &frame).await?;
        }
        Ok(info)
    }

    /// 公開中のストリームのメディアフラグを更新する（通知なし）
    pub async fn update(
        &self,
        session_id: &SessionId,
        owner: &ConnectionId,
        descriptor: StreamDescriptor,
    ) -> Result<(), StreamError> {
        let stream_id = StreamId::new(descriptor.stream_id)
            .map_err(|e| StreamError::InvalidStream(e.to_string()))?;
        let session = self.session(session_id).await?;
        let existing = session
            .streams
            .iter()
            .find(|s| s.id == stream_id)
            .ok_or_else(|| StreamError::StreamNotFound(stream_id.as_str().to_string()))?;
        if &existing.owner != owner {
            return Err(StreamError::NotOwner(stream_id.into_string()));
        }

        let mut updated = existing.clone();
        updated.audio_active = descriptor.audio_active;
        updated.video_active = descriptor.video_active;
        self.repository.upsert_stream(session_id, updated).await?;
        tracing::debug!(
            "Stream '{}' updated (audio: {}, video: {})",
            stream_id,
            descriptor.audio_active,
            descriptor.video_active
        );
        Ok(())
    }

    /// ストリームを取り下げ、他の参加者に `streamDestroyed` を通知する
    pub async fn unpublish(
        &self,
        session_id: &SessionId,
        owner: &ConnectionId,
        stream_id: String,
    ) -> Result<(), StreamError> {
        let stream_id =
            StreamId::new(stream_id).map_err(|e| StreamError::InvalidStream(e.to_string()))?;
        let session = self.session(session_id).await?;
        match session.streams.iter().find(|s| s.id == stream_id) {
            None => return Err(StreamError::StreamNotFound(stream_id.into_string())),
            Some(stream) if &stream.owner != owner => {
                return Err(StreamError::NotOwner(stream_id.into_string()));
            }
            Some(_) => {}
        }

        self.repository.remove_stream(session_id, &stream_id).await?;
        tracing::info!("Stream '{}' unpublished by '{}'", stream_id, owner);
        let frame = ServerFrame::StreamDestroyed {
            stream_id: stream_id.into_string(),
            connection_id: owner.as_str().to_string(),
            reason: REASON_UNPUBLISH.to_string(),
        };
        self.broadcast_except(&session, owner, &frame).await
    }

    /// ストリームの購読要求を受け付ける（存在確認のみ）
    pub async fn subscribe(
        &self,
        session_id: &SessionId,
        subscriber: &ConnectionId,
        stream_id: String,
    ) -> Result<(), StreamError> {
        let session = self.session(session_id).await?;
        if !session.streams.iter().any(|s| s.id.as_str() == stream_id) {
            return Err(StreamError::StreamNotFound(stream_id));
        }
        tracing::debug!("'{}' subscribed to stream '{}'", subscriber, stream_id);
        Ok(())
    }

    async fn session(&self, session_id: &SessionId) -> Result<Session, StreamError> {
        Ok(self.repository.get_session(session_id).await?)
    }

    fn ensure_owner(
        session: &Session,
        stream_id: &StreamId,
        owner: &ConnectionId,
    ) -> Result<(), StreamError> {
        match session.streams.iter().find(|s| &s.id == stream_id) {
            Some(existing) if &existing.owner != owner => {
                Err(StreamError::NotOwner(stream_id.as_str().to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn broadcast_except(
        &self,
        session: &Session,
        exclude: &ConnectionId,
        frame: &ServerFrame,
    ) -> Result<(), StreamError> {
        let targets: Vec<ConnectionId> = session
            .connections
            .iter()
            .filter(|c| &c.id != exclude)
            .map(|c| c.id.clone())
            .collect();
        let json =
            serde_json::to_string(frame).map_err(|e| StreamError::DeliveryFailed(e.to_string()))?;
        self.message_pusher
            .broadcast(targets, &json)
            .await
            .map_err(|e| StreamError::DeliveryFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Connection, DisplayName, Role},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::InMemorySessionRepository,
        },
    };
    use fanmeet_shared::time::FixedClock;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        usecase: PublishStreamUseCase,
        repository: Arc<InMemorySessionRepository>,
        host: Connection,
        fan: Connection,
        host_rx: UnboundedReceiver<String>,
        fan_rx: UnboundedReceiver<String>,
    }

    fn session_id() -> SessionId {
        SessionId::new("fm-1".to_string()).unwrap()
    }

    async fn setup() -> Fixture {
        let repository = Arc::new(InMemorySessionRepository::default());
        let pusher = Arc::new(WebSocketMessagePusher::default());
        repository
            .open_session(Session::new(session_id(), vec![], 10, Timestamp::new(0)))
            .await;
        let host = Connection::new(
            DisplayName::new("IU".to_string()).unwrap(),
            1,
            Role::Host,
            Timestamp::new(0),
        );
        let fan = Connection::new(
            DisplayName::new("fan".to_string()).unwrap(),
            2,
            Role::Fan,
            Timestamp::new(0),
        );
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (fan_tx, fan_rx) = mpsc::unbounded_channel();
        for (connection, tx) in [(&host, host_tx), (&fan, fan_tx)] {
            repository
                .add_connection(&session_id(), connection.clone())
                .await
                .unwrap();
            pusher.register_client(connection.id.clone(), tx).await;
        }
        let usecase = PublishStreamUseCase::new(
            repository.clone(),
            pusher,
            Arc::new(FixedClock::new(9_000)),
        );
        Fixture {
            usecase,
            repository,
            host,
            fan,
            host_rx,
            fan_rx,
        }
    }

    fn descriptor(id: &str, audio_active: bool) -> StreamDescriptor {
        StreamDescriptor {
            stream_id: id.to_string(),
            audio_active,
            video_active: true,
        }
    }

    #[tokio::test]
    async fn test_publish_notifies_others_only() {
        // テスト項目: 公開すると自分以外の参加者に streamCreated が届く
        // given (前提条件):
        let mut fx = setup().await;

        // when (操作):
        let info = fx
            .usecase
            .publish(&session_id(), &fx.host.id, descriptor("str_host", false))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(info.created_at, 9_000);
        let frame: ServerFrame = serde_json::from_str(&fx.fan_rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame, ServerFrame::StreamCreated { stream: info });
        assert!(fx.host_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_republish_is_treated_as_update() {
        // テスト項目: 同じ ID での再公開は更新として扱われ、通知されない
        // given (前提条件):
        let mut fx = setup().await;
        fx.usecase
            .publish(&session_id(), &fx.host.id, descriptor("str_host", false))
            .await
            .unwrap();
        fx.fan_rx.try_recv().unwrap();

        // when (操作):
        fx.usecase
            .publish(&session_id(), &fx.host.id, descriptor("str_host", true))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(fx.fan_rx.try_recv().is_err());
        let session = fx.repository.get_session(&session_id()).await.unwrap();
        assert_eq!(session.streams.len(), 1);
        assert!(session.streams[0].audio_active);
    }

    #[tokio::test]
    async fn test_update_and_unpublish_require_ownership() {
        // テスト項目: 他人のストリームは更新・取り下げできない
        // given (前提条件):
        let fx = setup().await;
        fx.usecase
            .publish(&session_id(), &fx.host.id, descriptor("str_host", false))
            .await
            .unwrap();

        // when (操作):
        let update = fx
            .usecase
            .update(&session_id(), &fx.fan.id, descriptor("str_host", true))
            .await;
        let unpublish = fx
            .usecase
            .unpublish(&session_id(), &fx.fan.id, "str_host".to_string())
            .await;
        let hijack = fx
            .usecase
            .publish(&session_id(), &fx.fan.id, descriptor("str_host", true))
            .await;

        // then (期待する結果):
        assert_eq!(update, Err(StreamError::NotOwner("str_host".to_string())));
        assert_eq!(unpublish, Err(StreamError::NotOwner("str_host".to_string())));
        assert!(matches!(hijack, Err(StreamError::NotOwner(_))));
    }

    #[tokio::test]
    async fn test_unpublish_notifies_stream_destroyed() {
        // テスト項目: 取り下げると他の参加者に streamDestroyed が届く
        // given (前提条件):
        let mut fx = setup().await;
        fx.usecase
            .publish(&session_id(), &fx.fan.id, descriptor("str_fan", false))
            .await
            .unwrap();
        fx.host_rx.try_recv().unwrap();

        // when (操作):
        fx.usecase
            .unpublish(&session_id(), &fx.fan.id, "str_fan".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        let frame: ServerFrame = serde_json::from_str(&fx.host_rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            frame,
            ServerFrame::StreamDestroyed {
                stream_id: "str_fan".to_string(),
                connection_id: fx.fan.id.as_str().to_string(),
                reason: "unpublish".to_string(),
            }
        );
        let subscribe = fx
            .usecase
            .subscribe(&session_id(), &fx.host.id, "str_fan".to_string())
            .await;
        assert_eq!(
            subscribe,
            Err(StreamError::StreamNotFound("str_fan".to_string()))
        );
    }
}

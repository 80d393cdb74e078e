//! プロセス内ループバック実装（RealtimeTransport + FanmeetingApi）
//!
//! ## 責務
//!
//! - 同じハブに接続したクライアント間でシグナルとストリームの公開を配送
//! - リレーと同じ規則: 送信者を含む全員（`to` 指定時はその宛先のみ）に配送、
//!   送信者情報はハブが付与、ホストは 1 セッションに 1 人
//! - REST 相当の操作（セッションのオープン・クローズ、録画の開始・停止）と
//!   その呼び出し履歴の記録
//!
//! 配送は `UnboundedSender` への送信なので、送信者ごとの FIFO が保たれます。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use fanmeet_shared::{
    protocol::websocket::{ConnectionInfo, StreamDescriptor, StreamInfo},
    time::get_timestamp_millis,
};
use tokio::sync::mpsc;

use crate::domain::{
    ApiError, FanmeetingApi, Identity, OutboundSignal, RealtimeTransport, TimetableEntry,
    TransportError, TransportEvent, TransportLink, TransportSession,
};

/// Recording request observed by the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingCall {
    Start {
        fanmeeting_id: String,
        record_id: String,
    },
    Stop {
        record_id: String,
        sequence: u32,
    },
}

struct Member {
    info: ConnectionInfo,
    events: mpsc::UnboundedSender<TransportEvent>,
}

#[derive(Default)]
struct HubSession {
    closed: bool,
    members: Vec<Member>,
    streams: Vec<StreamInfo>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<String, HubSession>,
    timetable: Vec<TimetableEntry>,
    next_connection: u64,
    next_record: u64,
    active_records: Vec<String>,
    recording_calls: Vec<RecordingCall>,
    fail_recordings: bool,
}

/// プロセス内のシグナリングハブ
///
/// `Clone` したハブは同じ状態を共有します。
#[derive(Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timetable handed out by `open_session`
    pub fn with_timetable(timetable: Vec<TimetableEntry>) -> Self {
        let hub = Self::default();
        hub.lock().timetable = timetable;
        hub
    }

    /// Make every following `start_recording` fail
    pub fn fail_recordings(&self, fail: bool) {
        self.lock().fail_recordings = fail;
    }

    pub fn recording_calls(&self) -> Vec<RecordingCall> {
        self.lock().recording_calls.clone()
    }

    pub fn connection_count(&self, session_id: &str) -> usize {
        self.lock()
            .sessions
            .get(session_id)
            .map_or(0, |session| session.members.len())
    }

    pub fn is_closed(&self, session_id: &str) -> bool {
        self.lock()
            .sessions
            .get(session_id)
            .is_some_and(|session| session.closed)
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // a panicking test thread must not take the other clients down with it
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RealtimeTransport for LoopbackHub {
    async fn connect(
        &self,
        session_id: &str,
        identity: &Identity,
    ) -> Result<TransportLink, TransportError> {
        let mut state = self.lock();
        state.next_connection += 1;
        let connection_id = format!("con_{}", state.next_connection);

        let session = state
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| TransportError::SessionNotFound(session_id.to_string()))?;
        if session.closed {
            return Err(TransportError::SessionClosed);
        }
        if identity.role.is_host() && session.members.iter().any(|m| m.info.role.is_host()) {
            return Err(TransportError::HostAlreadyConnected);
        }

        let info = ConnectionInfo {
            connection_id,
            display_name: identity.display_name.clone(),
            user_id: identity.user_id,
            role: identity.role,
            connected_at: get_timestamp_millis(),
        };
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        session.members.push(Member {
            info: info.clone(),
            events: events_tx,
        });
        let streams = session.streams.clone();
        tracing::debug!(
            "Loopback connection {} joined '{}'",
            info.connection_id,
            session_id
        );

        Ok(TransportLink {
            session: Box::new(LoopbackSession {
                hub: self.clone(),
                session_id: session_id.to_string(),
                connection: info.clone(),
            }),
            events: events_rx,
            local: info,
            streams,
        })
    }
}

struct LoopbackSession {
    hub: LoopbackHub,
    session_id: String,
    connection: ConnectionInfo,
}

impl LoopbackSession {
    /// Run `f` on our session, if we are still a member of it
    fn with_session<T>(
        &self,
        f: impl FnOnce(&mut HubSession) -> T,
    ) -> Result<T, TransportError> {
        let mut state = self.hub.lock();
        let session = state
            .sessions
            .get_mut(&self.session_id)
            .filter(|s| {
                s.members
                    .iter()
                    .any(|m| m.info.connection_id == self.connection.connection_id)
            })
            .ok_or(TransportError::Closed)?;
        Ok(f(session))
    }

    fn notify_others(&self, session: &HubSession, event: TransportEvent) {
        for member in session
            .members
            .iter()
            .filter(|m| m.info.connection_id != self.connection.connection_id)
        {
            let _ = member.events.send(event.clone());
        }
    }
}

#[async_trait]
impl TransportSession for LoopbackSession {
    fn signal(&self, signal: OutboundSignal) -> Result<(), TransportError> {
        self.with_session(|session| {
            let event = TransportEvent::Signal {
                kind: signal.kind.as_str().to_string(),
                data: signal.data.clone(),
                from: self.connection.clone(),
            };
            for member in session.members.iter().filter(|m| match &signal.to {
                Some(targets) => targets
                    .iter()
                    .any(|id| id.as_str() == m.info.connection_id),
                None => true,
            }) {
                let _ = member.events.send(event.clone());
            }
        })
    }

    fn publish(&self, stream: StreamDescriptor) -> Result<(), TransportError> {
        self.with_session(|session| {
            if let Some(existing) = session
                .streams
                .iter_mut()
                .find(|s| s.stream_id == stream.stream_id)
            {
                existing.audio_active = stream.audio_active;
                existing.video_active = stream.video_active;
                return;
            }
            let info = StreamInfo {
                stream_id: stream.stream_id,
                connection: self.connection.clone(),
                audio_active: stream.audio_active,
                video_active: stream.video_active,
                created_at: get_timestamp_millis(),
            };
            session.streams.push(info.clone());
            self.notify_others(session, TransportEvent::StreamCreated(info));
        })
    }

    fn update_stream(&self, stream: StreamDescriptor) -> Result<(), TransportError> {
        self.with_session(|session| {
            if let Some(existing) = session.streams.iter_mut().find(|s| {
                s.stream_id == stream.stream_id
                    && s.connection.connection_id == self.connection.connection_id
            }) {
                existing.audio_active = stream.audio_active;
                existing.video_active = stream.video_active;
            }
        })
    }

    fn unpublish(&self, stream_id: &str) -> Result<(), TransportError> {
        self.with_session(|session| {
            let before = session.streams.len();
            session.streams.retain(|s| {
                s.stream_id != stream_id
                    || s.connection.connection_id != self.connection.connection_id
            });
            if session.streams.len() < before {
                self.notify_others(
                    session,
                    TransportEvent::StreamDestroyed {
                        stream_id: stream_id.to_string(),
                        connection_id: self.connection.connection_id.clone(),
                        reason: "unpublish".to_string(),
                    },
                );
            }
        })
    }

    fn subscribe(&self, stream_id: &str) -> Result<(), TransportError> {
        self.with_session(|session| {
            if !session.streams.iter().any(|s| s.stream_id == stream_id) {
                tracing::debug!("Subscribe to unknown stream {}", stream_id);
            }
        })
    }

    async fn disconnect(&self) {
        let mut state = self.hub.lock();
        let Some(session) = state.sessions.get_mut(&self.session_id) else {
            return;
        };
        let me = &self.connection.connection_id;
        session.members.retain(|m| &m.info.connection_id != me);
        let (gone, kept): (Vec<StreamInfo>, Vec<StreamInfo>) = session
            .streams
            .drain(..)
            .partition(|s| &s.connection.connection_id == me);
        session.streams = kept;
        for stream in gone {
            self.notify_others(
                session,
                TransportEvent::StreamDestroyed {
                    stream_id: stream.stream_id,
                    connection_id: me.clone(),
                    reason: "disconnect".to_string(),
                },
            );
        }
        tracing::debug!("Loopback connection {} left '{}'", me, self.session_id);
    }
}

#[async_trait]
impl FanmeetingApi for LoopbackHub {
    async fn open_session(&self, session_id: &str) -> Result<Vec<TimetableEntry>, ApiError> {
        if session_id.trim().is_empty() {
            return Err(ApiError::new("SESSION-001", "session id must not be empty"));
        }
        let mut state = self.lock();
        state.sessions.entry(session_id.to_string()).or_default();
        Ok(state.timetable.clone())
    }

    async fn close_session(&self, session_id: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        let session = state.sessions.get_mut(session_id).ok_or_else(|| {
            ApiError::new("SESSION-002", format!("session not found: {}", session_id))
        })?;
        session.closed = true;
        Ok(())
    }

    async fn start_recording(&self, fanmeeting_id: &str) -> Result<String, ApiError> {
        let mut state = self.lock();
        if state.fail_recordings {
            return Err(ApiError::new("RECORD-500", "recording service unavailable"));
        }
        if !state.sessions.contains_key(fanmeeting_id) {
            return Err(ApiError::new(
                "RECORD-002",
                format!("session not found: {}", fanmeeting_id),
            ));
        }
        state.next_record += 1;
        let record_id = format!("rec_{}", state.next_record);
        state.active_records.push(record_id.clone());
        state.recording_calls.push(RecordingCall::Start {
            fanmeeting_id: fanmeeting_id.to_string(),
            record_id: record_id.clone(),
        });
        Ok(record_id)
    }

    async fn stop_recording(&self, record_id: &str, sequence: u32) -> Result<(), ApiError> {
        let mut state = self.lock();
        let Some(index) = state.active_records.iter().position(|r| r == record_id) else {
            return Err(ApiError::new(
                "RECORD-004",
                format!("recording not found: {}", record_id),
            ));
        };
        state.active_records.remove(index);
        state.recording_calls.push(RecordingCall::Stop {
            record_id: record_id.to_string(),
            sequence,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fanmeet_shared::protocol::Role;

    use super::*;
    use crate::domain::{ConnectionId, SignalKind, signal::NextCorner};

    async fn joined(hub: &LoopbackHub, name: &str, role: Role) -> TransportLink {
        hub.connect(
            "fm-1",
            &Identity {
                display_name: name.to_string(),
                user_id: 1,
                role,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_including_sender() {
        // テスト項目: ブロードキャストは送信者を含む全員に届き、送信者情報が付与される
        // given (前提条件):
        let hub = LoopbackHub::new();
        hub.open_session("fm-1").await.unwrap();
        let mut host = joined(&hub, "IU", Role::Host).await;
        let mut fan = joined(&hub, "uaena", Role::Fan).await;

        // when (操作):
        host.session
            .signal(OutboundSignal::broadcast(&NextCorner { sequence: 1 }).unwrap())
            .unwrap();

        // then (期待する結果):
        for link in [&mut host, &mut fan] {
            match link.events.recv().await.unwrap() {
                TransportEvent::Signal { kind, from, .. } => {
                    assert_eq!(kind, SignalKind::NextCorner.as_str());
                    assert_eq!(from.role, Role::Host);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_unicast_reaches_only_targets() {
        // テスト項目: 宛先指定のシグナルは宛先にだけ届く
        // given (前提条件):
        let hub = LoopbackHub::new();
        hub.open_session("fm-1").await.unwrap();
        let host = joined(&hub, "IU", Role::Host).await;
        let mut fan_a = joined(&hub, "a", Role::Fan).await;
        let mut fan_b = joined(&hub, "b", Role::Fan).await;
        let target = ConnectionId::new(fan_a.local.connection_id.clone());

        // when (操作):
        host.session
            .signal(
                OutboundSignal::unicast(
                    &crate::domain::signal::FanAudioStatus { audio_active: true },
                    vec![target],
                )
                .unwrap(),
            )
            .unwrap();

        // then (期待する結果):
        assert!(matches!(
            fan_a.events.recv().await,
            Some(TransportEvent::Signal { .. })
        ));
        assert!(fan_b.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_host_and_closed_session_are_rejected() {
        // テスト項目: 2 人目のホストとクローズ済みセッションへの接続は拒否される
        // given (前提条件):
        let hub = LoopbackHub::new();
        hub.open_session("fm-1").await.unwrap();
        let _host = joined(&hub, "IU", Role::Host).await;

        // when (操作):
        let second = hub.connect("fm-1", &Identity::host("impostor", 2)).await;
        let unknown = hub.connect("fm-404", &Identity::fan("fan", 3)).await;
        hub.close_session("fm-1").await.unwrap();
        let late = hub.connect("fm-1", &Identity::fan("late", 4)).await;

        // then (期待する結果):
        assert!(matches!(second, Err(TransportError::HostAlreadyConnected)));
        assert!(matches!(unknown, Err(TransportError::SessionNotFound(_))));
        assert!(matches!(late, Err(TransportError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_disconnect_destroys_published_streams() {
        // テスト項目: 切断すると公開中のストリームが破棄され、他の参加者に通知される
        // given (前提条件):
        let hub = LoopbackHub::new();
        hub.open_session("fm-1").await.unwrap();
        let mut host = joined(&hub, "IU", Role::Host).await;
        let fan = joined(&hub, "uaena", Role::Fan).await;
        fan.session
            .publish(StreamDescriptor {
                stream_id: "str_fan".to_string(),
                audio_active: false,
                video_active: true,
            })
            .unwrap();

        // when (操作):
        fan.session.disconnect().await;

        // then (期待する結果):
        assert!(matches!(
            host.events.recv().await,
            Some(TransportEvent::StreamCreated(info)) if info.stream_id == "str_fan"
        ));
        assert!(matches!(
            host.events.recv().await,
            Some(TransportEvent::StreamDestroyed { reason, .. }) if reason == "disconnect"
        ));
        assert_eq!(hub.connection_count("fm-1"), 1);
        assert!(fan.session.signal(
            OutboundSignal::broadcast(&NextCorner { sequence: 1 }).unwrap()
        ).is_err());
    }

    #[tokio::test]
    async fn test_recording_calls_are_recorded() {
        // テスト項目: 録画の開始・停止が記録され、未知の録画の停止は RECORD-004 になる
        // given (前提条件):
        let hub = LoopbackHub::new();
        hub.open_session("fm-1").await.unwrap();

        // when (操作):
        let record_id = hub.start_recording("fm-1").await.unwrap();
        hub.stop_recording(&record_id, 1).await.unwrap();
        let again = hub.stop_recording(&record_id, 1).await;

        // then (期待する結果):
        assert_eq!(
            hub.recording_calls(),
            vec![
                RecordingCall::Start {
                    fanmeeting_id: "fm-1".to_string(),
                    record_id: record_id.clone(),
                },
                RecordingCall::Stop {
                    record_id,
                    sequence: 1,
                },
            ]
        );
        assert_eq!(again.unwrap_err().code, "RECORD-004");
    }
}

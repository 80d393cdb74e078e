//! UseCase: セッション接続の管理
//!
//! ## 責務
//!
//! - 接続状態 `Disconnected → Connecting → Connected → Disconnected` の管理
//! - 接続時の初期化（REST でセッションをオープン、トランスポート接続、
//!   ハンドラ登録、Publisher の公開、既存ストリームの取り込み）
//! - トランスポート・タイマー・REST の完了イベントを 1 つずつ状態に適用
//! - ホスト・ファンの操作をシグナルに変換して送信
//!
//! 状態はこの構造体を所有する 1 つのタスクからのみ `&mut self` で変更されます。
//! 非同期に完了するイベントには接続ごとのエポックが付き、古いエポックの
//! イベントは無視されます。

use std::sync::Arc;

use fanmeet_shared::{protocol::websocket::StreamInfo, time::Clock};
use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::domain::{
    ApiError, AudioFocusCoordinator, ChatAggregator, ConnectionId, FanmeetingApi, Identity,
    InboundSignal, OutboundSignal, Participant, ParticipantRegistry, PhotoError,
    PhotoTimeCoordinator, PhotoTimerEvent, Publisher, Quiz, QuizRankCoordinator, Rank,
    RealtimeTransport, RoomStateMachine, SessionError, TransportEvent, TransportSession,
    signal::{CloseSession, EndPhoto, NextPhoto, StartPhotoTimer},
};

use super::{
    config::SessionConfig,
    handlers,
    signal_bus::SignalBus,
    update::{Reaction, SessionUpdate},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// The local view of one session. Rebuilt at defaults on every connect.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) identity: Option<Identity>,
    pub(crate) local_id: Option<ConnectionId>,
    pub(crate) publisher: Option<Publisher>,
    pub(crate) registry: ParticipantRegistry,
    pub(crate) room: RoomStateMachine,
    pub(crate) audio: AudioFocusCoordinator,
    pub(crate) chat: ChatAggregator,
    pub(crate) quiz: QuizRankCoordinator,
    pub(crate) photo: PhotoTimeCoordinator,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            identity: None,
            local_id: None,
            publisher: None,
            registry: ParticipantRegistry::new(),
            room: RoomStateMachine::new(),
            audio: AudioFocusCoordinator::new(),
            chat: ChatAggregator::new(config.chat_throttle.as_millis() as i64),
            quiz: QuizRankCoordinator::new(),
            photo: PhotoTimeCoordinator::new(
                config.photo_shots,
                config.countdown,
                config.capture_indicator,
            ),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn local_id(&self) -> Option<&ConnectionId> {
        self.local_id.as_ref()
    }

    pub fn publisher(&self) -> Option<&Publisher> {
        self.publisher.as_ref()
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn room(&self) -> &RoomStateMachine {
        &self.room
    }

    pub fn audio(&self) -> &AudioFocusCoordinator {
        &self.audio
    }

    pub fn chat(&self) -> &ChatAggregator {
        &self.chat
    }

    pub fn quiz(&self) -> &QuizRankCoordinator {
        &self.quiz
    }

    pub fn photo(&self) -> &PhotoTimeCoordinator {
        &self.photo
    }

    pub fn is_host(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.role.is_host())
    }
}

/// Events produced off the manager's task and reported back to it
#[derive(Debug)]
enum LoopEvent {
    Timer {
        epoch: u64,
        event: PhotoTimerEvent,
    },
    RecordingStarted {
        epoch: u64,
        sequence: u32,
        result: Result<String, ApiError>,
    },
    RecordingStopped {
        epoch: u64,
        record_id: String,
        sequence: u32,
        result: Result<(), ApiError>,
    },
}

enum Incoming {
    /// `None` when the transport dropped its event channel
    Transport(Option<TransportEvent>),
    Loop(LoopEvent),
}

struct ActiveLink {
    session: Box<dyn TransportSession>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

pub struct SessionConnectionManager {
    transport: Arc<dyn RealtimeTransport>,
    api: Arc<dyn FanmeetingApi>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    status: ConnectionStatus,
    epoch: u64,
    session_id: Option<String>,
    state: SessionState,
    bus: SignalBus<SessionState>,
    link: Option<ActiveLink>,
    loop_tx: mpsc::UnboundedSender<LoopEvent>,
    loop_rx: mpsc::UnboundedReceiver<LoopEvent>,
    rng: StdRng,
}

impl SessionConnectionManager {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        api: Arc<dyn FanmeetingApi>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let bus = SignalBus::new().with_host_scope(config.enforce_host_signals);
        Self {
            transport,
            api,
            clock,
            state: SessionState::new(&config),
            config,
            status: ConnectionStatus::Disconnected,
            epoch: 0,
            session_id: None,
            bus,
            link: None,
            loop_tx,
            loop_rx,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Join `session_id` as `identity`. Any failure is terminal for the
    /// attempt: the status returns to `Disconnected` and nothing is retried.
    pub async fn connect(&mut self, session_id: &str, identity: Identity) -> Result<(), SessionError> {
        if self.status != ConnectionStatus::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        self.status = ConnectionStatus::Connecting;
        self.epoch += 1;
        self.state = SessionState::new(&self.config);
        tracing::info!(
            "Joining session '{}' as '{}' ({})",
            session_id,
            identity.display_name,
            identity.role
        );

        match self.establish(session_id, identity).await {
            Ok(()) => {
                self.status = ConnectionStatus::Connected;
                tracing::info!(
                    "Joined session '{}' with {} participants",
                    session_id,
                    self.state.registry.len()
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to join session '{}': {}", session_id, e);
                self.leave().await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self, session_id: &str, identity: Identity) -> Result<(), SessionError> {
        let timetable = self.api.open_session(session_id).await?;
        self.state.room.load_timetable(timetable);

        let link = self.transport.connect(session_id, &identity).await?;
        let me = ConnectionId::new(link.local.connection_id.clone());
        self.link = Some(ActiveLink {
            session: link.session,
            events: link.events,
        });
        self.session_id = Some(session_id.to_string());
        self.state.identity = Some(identity);
        self.state.local_id = Some(me.clone());

        self.bus.clear();
        handlers::register_all(&mut self.bus)?;

        let publisher = Publisher::new();
        self.session()?.publish(publisher.descriptor())?;
        self.state.audio.apply_audio_status(me, publisher.audio_active);
        self.state.publisher = Some(publisher);

        for stream in &link.streams {
            self.ingest_stream(stream);
        }
        Ok(())
    }

    /// Disconnect and discard everything about the session. Safe to call
    /// when not connected.
    pub async fn leave(&mut self) {
        if let Some(link) = self.link.take() {
            link.session.disconnect().await;
        }
        self.bus.clear();
        self.state.photo.cancel();
        self.state = SessionState::new(&self.config);
        self.session_id = None;
        self.epoch += 1;
        if self.status != ConnectionStatus::Disconnected {
            tracing::info!("Left the session");
        }
        self.status = ConnectionStatus::Disconnected;
    }

    /// Host: close the session for everyone, then leave and enter the
    /// ended state.
    pub async fn close(&mut self, reason: &str) -> Result<(), SessionError> {
        self.require_host()?;
        if let Some(session_id) = self.session_id.clone()
            && let Err(e) = self.api.close_session(&session_id).await
        {
            tracing::warn!("Failed to close session '{}': {}", session_id, e);
        }
        let notice = OutboundSignal::broadcast(&CloseSession {
            reason: reason.to_string(),
        })?;
        if let Err(e) = self.send(notice) {
            tracing::warn!("Failed to announce the close: {}", e);
        }
        self.leave().await;
        self.state.room.end(reason);
        Ok(())
    }

    /// Wait for the next event and apply it. Returns `None` once disconnected.
    pub async fn step(&mut self) -> Option<SessionUpdate> {
        loop {
            let incoming = {
                let link = self.link.as_mut()?;
                tokio::select! {
                    event = link.events.recv() => Incoming::Transport(event),
                    Some(event) = self.loop_rx.recv() => Incoming::Loop(event),
                }
            };
            if let Some(update) = self.handle(incoming).await {
                return Some(update);
            }
        }
    }

    /// Apply every event that is already queued, without waiting.
    pub async fn drain(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(incoming) = self.try_next() {
            if let Some(update) = self.handle(incoming).await {
                updates.push(update);
            }
        }
        updates
    }

    fn try_next(&mut self) -> Option<Incoming> {
        if let Some(link) = self.link.as_mut() {
            match link.events.try_recv() {
                Ok(event) => return Some(Incoming::Transport(Some(event))),
                Err(TryRecvError::Disconnected) => return Some(Incoming::Transport(None)),
                Err(TryRecvError::Empty) => {}
            }
        }
        self.loop_rx.try_recv().ok().map(Incoming::Loop)
    }

    async fn handle(&mut self, incoming: Incoming) -> Option<SessionUpdate> {
        match incoming {
            Incoming::Transport(Some(event)) => self.handle_transport(event).await,
            Incoming::Transport(None) => {
                self.leave().await;
                Some(SessionUpdate::ConnectionLost {
                    reason: "transport closed".to_string(),
                })
            }
            Incoming::Loop(event) => self.handle_loop(event),
        }
    }

    async fn handle_transport(&mut self, event: TransportEvent) -> Option<SessionUpdate> {
        match event {
            TransportEvent::StreamCreated(stream) => self.ingest_stream(&stream),
            TransportEvent::StreamDestroyed {
                stream_id, reason, ..
            } => {
                let participant = self.state.registry.on_stream_destroyed(&stream_id)?;
                self.state.audio.forget(&participant.connection_id);
                tracing::debug!(
                    "Participant '{}' left ({})",
                    participant.display_name,
                    reason
                );
                Some(SessionUpdate::ParticipantLeft {
                    participant,
                    reason,
                })
            }
            TransportEvent::Signal { kind, data, from } => {
                let inbound = match InboundSignal::parse(&kind, data, from) {
                    Ok(inbound) => inbound,
                    Err(e) => {
                        tracing::warn!("Dropped signal: {}", e);
                        return Some(SessionUpdate::SignalRejected(e));
                    }
                };
                match self.bus.dispatch(&mut self.state, &inbound) {
                    Ok(Some(reaction)) => self.react(reaction).await,
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!("Dropped '{}' signal: {}", inbound.kind, e);
                        Some(SessionUpdate::SignalRejected(e))
                    }
                }
            }
            TransportEvent::Exception { name, message } => {
                tracing::warn!("Transport exception {}: {}", name, message);
                Some(SessionUpdate::TransportWarning { name, message })
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!("Connection lost: {}", reason);
                self.leave().await;
                Some(SessionUpdate::ConnectionLost { reason })
            }
        }
    }

    async fn react(&mut self, reaction: Reaction) -> Option<SessionUpdate> {
        match reaction {
            Reaction::Update(update) => Some(update),
            Reaction::PublisherChanged(update) => {
                self.announce_publisher();
                Some(update)
            }
            Reaction::StartCountdown { deadline } => {
                let remaining = self.start_countdown(deadline);
                Some(SessionUpdate::CountdownStarted { remaining })
            }
            Reaction::SessionClosed { reason } => {
                tracing::info!("Session closed by the host: {}", reason);
                self.leave().await;
                self.state.room.end(reason.clone());
                Some(SessionUpdate::SessionEnded { reason })
            }
            Reaction::Ignored => None,
        }
    }

    fn handle_loop(&mut self, event: LoopEvent) -> Option<SessionUpdate> {
        match event {
            LoopEvent::Timer { epoch, event } => {
                if epoch != self.epoch || !self.state.photo.apply_timer_event(event) {
                    return None;
                }
                match event {
                    PhotoTimerEvent::Tick { remaining, .. } => {
                        Some(SessionUpdate::CountdownTick(remaining))
                    }
                    PhotoTimerEvent::Captured { .. } => Some(SessionUpdate::PhotoCaptured {
                        sequence: self.state.photo.sequence(),
                    }),
                    PhotoTimerEvent::CaptureCleared { .. } => {
                        if self.state.is_host()
                            && let Some(record_id) = self.state.photo.take_recording()
                        {
                            self.spawn_stop_recording(record_id, self.state.photo.sequence());
                        }
                        Some(SessionUpdate::CaptureCleared)
                    }
                }
            }
            LoopEvent::RecordingStarted {
                epoch,
                sequence,
                result,
            } => {
                if epoch != self.epoch || self.status != ConnectionStatus::Connected {
                    tracing::debug!("Dropping recording start of a previous session");
                    return None;
                }
                self.state.photo.end_advance();
                let update = match result {
                    Ok(record_id) => {
                        self.state.photo.set_recording(record_id.clone());
                        SessionUpdate::RecordingStarted {
                            record_id,
                            sequence,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to start recording shot {}: {}", sequence, e);
                        SessionUpdate::RecordingFailed(e)
                    }
                };
                if let Err(e) = self.begin_shot(sequence) {
                    tracing::warn!("Failed to start shot {}: {}", sequence, e);
                }
                Some(update)
            }
            LoopEvent::RecordingStopped {
                epoch,
                record_id,
                sequence,
                result,
            } => {
                if epoch != self.epoch {
                    return None;
                }
                Some(match result {
                    Ok(()) => SessionUpdate::RecordingStopped {
                        record_id,
                        sequence,
                    },
                    Err(e) => {
                        tracing::warn!("Failed to stop recording {}: {}", record_id, e);
                        SessionUpdate::RecordingFailed(e)
                    }
                })
            }
        }
    }

    /// Subscribe to a remote stream and add its owner to the registry.
    fn ingest_stream(&mut self, stream: &StreamInfo) -> Option<SessionUpdate> {
        if self
            .state
            .local_id
            .as_ref()
            .is_some_and(|me| me.as_str() == stream.connection.connection_id)
        {
            return None;
        }
        if let Ok(session) = self.session()
            && let Err(e) = session.subscribe(&stream.stream_id)
        {
            tracing::warn!("Failed to subscribe to {}: {}", stream.stream_id, e);
        }
        let participant = Participant::from(stream);
        self.state.audio.apply_audio_status(
            participant.connection_id.clone(),
            participant.stream.audio_active,
        );
        self.state.registry.on_stream_created(participant.clone());
        Some(SessionUpdate::ParticipantJoined(participant))
    }

    /// Start the local countdown; returns the seconds left.
    fn start_countdown(&mut self, deadline: Option<i64>) -> u32 {
        let tx = self.loop_tx.clone();
        let epoch = self.epoch;
        let now = self.clock.now_millis();
        self.state.photo.start_countdown(deadline, now, move |event| {
            let _ = tx.send(LoopEvent::Timer { epoch, event });
        });
        self.state.photo.countdown_remaining().unwrap_or(0)
    }

    /// Host: the recording request resolved; run the shot for everyone.
    fn begin_shot(&mut self, sequence: u32) -> Result<(), SessionError> {
        let countdown_ms = i64::try_from(self.config.countdown.as_millis()).unwrap_or(i64::MAX);
        let deadline = Some(self.clock.now_millis().saturating_add(countdown_ms));
        self.start_countdown(deadline);
        self.send(OutboundSignal::broadcast(&NextPhoto { sequence })?)?;
        self.send(OutboundSignal::broadcast(&StartPhotoTimer { deadline })?)?;
        Ok(())
    }

    fn spawn_stop_recording(&self, record_id: String, sequence: u32) {
        let api = self.api.clone();
        let tx = self.loop_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.stop_recording(&record_id, sequence).await;
            let _ = tx.send(LoopEvent::RecordingStopped {
                epoch,
                record_id,
                sequence,
                result,
            });
        });
    }

    fn session(&self) -> Result<&dyn TransportSession, SessionError> {
        self.link
            .as_ref()
            .map(|link| link.session.as_ref())
            .ok_or(SessionError::NotConnected)
    }

    fn send(&self, signal: OutboundSignal) -> Result<(), SessionError> {
        self.bus.send(self.session()?, signal)?;
        Ok(())
    }

    fn announce_publisher(&self) {
        let (Some(publisher), Ok(session)) = (self.state.publisher.as_ref(), self.session()) else {
            return;
        };
        if let Err(e) = session.update_stream(publisher.descriptor()) {
            tracing::warn!("Failed to update the published stream: {}", e);
        }
    }

    fn require_connected(&self) -> Result<(), SessionError> {
        if self.status != ConnectionStatus::Connected {
            return Err(SessionError::NotConnected);
        }
        Ok(())
    }

    fn require_host(&self) -> Result<(), SessionError> {
        self.require_connected()?;
        if !self.state.is_host() {
            return Err(SessionError::NotHost);
        }
        Ok(())
    }

    fn me(&self) -> Result<ConnectionId, SessionError> {
        self.state
            .local_id
            .clone()
            .ok_or(SessionError::NotConnected)
    }

    fn known_participant(&self, id: &ConnectionId) -> Result<(), SessionError> {
        if self.state.registry.contains(id) {
            Ok(())
        } else {
            Err(SessionError::UnknownParticipant(id.to_string()))
        }
    }

    // ---- microphone, camera and focus ----

    /// Flip the own microphone. Returns the new state.
    pub fn toggle_self_audio(&mut self) -> Result<bool, SessionError> {
        self.require_connected()?;
        let me = self.me()?;
        let publisher = self
            .state
            .publisher
            .as_mut()
            .ok_or(SessionError::NotConnected)?;
        let signal = self.state.audio.toggle_self_audio(publisher, &me)?;
        let active = publisher.audio_active;
        self.announce_publisher();
        self.send(signal)?;
        Ok(active)
    }

    /// Turn the own microphone off. Returns false when it was already off.
    pub fn mute_self(&mut self) -> Result<bool, SessionError> {
        self.require_connected()?;
        let me = self.me()?;
        let publisher = self
            .state
            .publisher
            .as_mut()
            .ok_or(SessionError::NotConnected)?;
        let Some(signal) = self.state.audio.mute_self(publisher, &me)? else {
            return Ok(false);
        };
        self.announce_publisher();
        self.send(signal)?;
        Ok(true)
    }

    /// Flip the own camera. Nobody is signaled; the stream flags change.
    pub fn toggle_self_video(&mut self) -> Result<bool, SessionError> {
        self.require_connected()?;
        let publisher = self
            .state
            .publisher
            .as_mut()
            .ok_or(SessionError::NotConnected)?;
        publisher.video_active = !publisher.video_active;
        let active = publisher.video_active;
        self.announce_publisher();
        Ok(active)
    }

    /// Host: set a fan's microphone.
    pub fn remote_set_audio(&mut self, target: &ConnectionId, active: bool) -> Result<(), SessionError> {
        self.require_host()?;
        self.known_participant(target)?;
        let signal = self.state.audio.remote_set_audio(target, active)?;
        self.send(signal)
    }

    /// Host: flip a fan's microphone. Returns the requested state.
    pub fn toggle_remote_audio(&mut self, target: &ConnectionId) -> Result<bool, SessionError> {
        self.require_host()?;
        let participant = self
            .state
            .registry
            .get(target)
            .ok_or_else(|| SessionError::UnknownParticipant(target.to_string()))?;
        let current = self
            .state
            .audio
            .is_active(target)
            .unwrap_or(participant.stream.audio_active);
        self.remote_set_audio(target, !current)?;
        Ok(!current)
    }

    /// Focus a participant for everyone; focusing the focused one clears it.
    pub fn toggle_focus(&mut self, target: &ConnectionId) -> Result<(), SessionError> {
        self.require_connected()?;
        if self.state.local_id.as_ref() != Some(target) {
            self.known_participant(target)?;
        }
        let signal = self.state.audio.toggle_focus(target)?;
        self.send(signal)
    }

    // ---- chat ----

    pub fn post_chat(&mut self, text: &str) -> Result<(), SessionError> {
        self.require_connected()?;
        let (sender, is_host) = match &self.state.identity {
            Some(identity) => (identity.display_name.clone(), identity.role.is_host()),
            None => return Err(SessionError::NotConnected),
        };
        let now = self.clock.now_millis();
        let signal = self.state.chat.post_message(&sender, is_host, text, now)?;
        self.send(signal)?;
        self.state.chat.mark_sent(now);
        Ok(())
    }

    // ---- corners and quiz ----

    /// Host: move everyone to corner `sequence`.
    pub fn go_to_corner(&mut self, sequence: u32) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.room.go_to_corner(sequence)?;
        self.send(signal)
    }

    pub fn set_quiz(&mut self, quiz: Quiz) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.quiz.set_quiz(quiz)?;
        self.send(signal)
    }

    pub fn clear_quiz(&mut self) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.quiz.clear_quiz()?;
        self.send(signal)
    }

    pub fn submit_answer(&mut self, answer: bool) -> Result<(), SessionError> {
        self.require_connected()?;
        let user_id = self
            .state
            .identity
            .as_ref()
            .map(|identity| identity.user_id)
            .ok_or(SessionError::NotConnected)?;
        let signal = self.state.quiz.submit_answer(user_id, answer)?;
        self.send(signal)
    }

    pub fn reset_answers(&mut self) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.quiz.reset_answers()?;
        self.send(signal)
    }

    pub fn set_reveal(&mut self, revealed: bool) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.quiz.set_reveal(revealed)?;
        self.send(signal)
    }

    pub fn set_ranks(&mut self, ranks: Vec<Rank>) -> Result<(), SessionError> {
        self.require_host()?;
        let signal = self.state.quiz.set_ranks(ranks)?;
        self.send(signal)
    }

    /// Apply a reveal pushed from outside the session. Local only: nothing is
    /// broadcast, so other clients keep their own value.
    pub fn apply_reveal(&mut self, revealed: bool) -> SessionUpdate {
        self.state.quiz.apply_reveal(revealed);
        SessionUpdate::RevealChanged(revealed)
    }

    /// Apply ranks pushed from outside the session. Local only.
    pub fn apply_ranks(&mut self, ranks: Vec<Rank>) -> SessionUpdate {
        self.state.quiz.apply_ranks(ranks.clone());
        SessionUpdate::RanksChanged(ranks)
    }

    // ---- photo time ----

    /// Host: prepare the next shot. The recording is requested in the
    /// background; the countdown starts once it resolves. Returns the
    /// sequence of the upcoming shot.
    pub fn advance_photo(&mut self) -> Result<u32, SessionError> {
        self.require_host()?;
        let sequence = self.state.photo.check_advance()?;
        let session_id = self
            .session_id
            .clone()
            .ok_or(SessionError::NotConnected)?;
        self.state.photo.begin_advance();

        let api = self.api.clone();
        let tx = self.loop_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = api.start_recording(&session_id).await;
            let _ = tx.send(LoopEvent::RecordingStarted {
                epoch,
                sequence,
                result,
            });
        });
        Ok(sequence)
    }

    /// Host: stop the active recording now.
    pub fn stop_recording(&mut self) -> Result<(), SessionError> {
        self.require_host()?;
        let record_id = self
            .state
            .photo
            .take_recording()
            .ok_or(PhotoError::NoActiveRecording)?;
        self.spawn_stop_recording(record_id, self.state.photo.sequence());
        Ok(())
    }

    /// Host: end the photo corner once every shot has been taken.
    pub fn finish_photo(&mut self) -> Result<(), SessionError> {
        self.require_host()?;
        self.state.photo.check_finish()?;
        self.send(OutboundSignal::broadcast(&EndPhoto {})?)
    }

    /// Host: pick a random fan to stand beside the host.
    pub fn pick_photo_partner(&mut self) -> Result<ConnectionId, SessionError> {
        self.require_host()?;
        let fans: Vec<ConnectionId> = self
            .state
            .registry
            .fans()
            .map(|p| p.connection_id.clone())
            .collect();
        Ok(self.state.photo.pick_partner(&fans, &mut self.rng)?)
    }
}

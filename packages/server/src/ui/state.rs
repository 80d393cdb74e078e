//! Server state shared by every handler.

use std::sync::Arc;

use fanmeet_shared::time::Clock;

use crate::{
    domain::{MessagePusher, SessionRepository, TimetableEntry},
    usecase::{
        CloseSessionUseCase, ConnectParticipantUseCase, DisconnectParticipantUseCase,
        GetSessionsUseCase, OpenSessionUseCase, PublishStreamUseCase, RecordingUseCase,
        RelaySignalUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub connect_participant_usecase: ConnectParticipantUseCase,
    pub disconnect_participant_usecase: DisconnectParticipantUseCase,
    pub relay_signal_usecase: RelaySignalUseCase,
    pub publish_stream_usecase: PublishStreamUseCase,
    pub open_session_usecase: OpenSessionUseCase,
    pub close_session_usecase: CloseSessionUseCase,
    pub get_sessions_usecase: GetSessionsUseCase,
    pub recording_usecase: RecordingUseCase,
    /// MessagePusher（例外フレームを送信元へ直接返すため）
    pub message_pusher: Arc<dyn MessagePusher>,
}

impl AppState {
    /// Wire every use case to the given repository, pusher and clock.
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        timetable: Vec<TimetableEntry>,
        max_participants: usize,
    ) -> Self {
        Self {
            connect_participant_usecase: ConnectParticipantUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            disconnect_participant_usecase: DisconnectParticipantUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            ),
            relay_signal_usecase: RelaySignalUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            ),
            publish_stream_usecase: PublishStreamUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            ),
            open_session_usecase: OpenSessionUseCase::new(
                repository.clone(),
                clock.clone(),
                timetable,
                max_participants,
            ),
            close_session_usecase: CloseSessionUseCase::new(repository.clone()),
            get_sessions_usecase: GetSessionsUseCase::new(repository.clone()),
            recording_usecase: RecordingUseCase::new(repository, clock),
            message_pusher,
        }
    }
}

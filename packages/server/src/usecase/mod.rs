//! UseCase layer: orchestrates the domain for each relay and REST operation.

pub mod close_session;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod get_sessions;
pub mod open_session;
pub mod publish_stream;
pub mod recording;
pub mod relay_signal;

pub use close_session::CloseSessionUseCase;
pub use connect_participant::{ConnectParticipantUseCase, ConnectRequest};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{
    ConnectError, DisconnectError, RecordingError, RelayError, SessionError, StreamError,
};
pub use get_sessions::GetSessionsUseCase;
pub use open_session::OpenSessionUseCase;
pub use publish_stream::PublishStreamUseCase;
pub use recording::RecordingUseCase;
pub use relay_signal::RelaySignalUseCase;

//! Domain layer: per-client session state and the collaborator traits it runs against.
//!
//! Each coordinator owns one slice of the shared state and never calls another
//! coordinator; cross-cutting effects travel as signals.

pub mod api;
pub mod audio_focus;
pub mod chat;
pub mod error;
pub mod participant;
pub mod photo_time;
pub mod quiz;
pub mod room_state;
pub mod signal;
pub mod transport;

pub use api::FanmeetingApi;
#[cfg(test)]
pub use api::MockFanmeetingApi;
pub use audio_focus::AudioFocusCoordinator;
pub use chat::{ChatAggregator, ChatMessage, ColorCache};
pub use error::{ApiError, ChatError, PhotoError, SessionError, SignalError, TransportError};
pub use fanmeet_shared::protocol::Role;
pub use participant::{ConnectionId, Identity, Participant, ParticipantRegistry, Publisher, RemoteStream};
pub use photo_time::{PhotoTimeCoordinator, PhotoTimerEvent};
pub use quiz::{Quiz, QuizRankCoordinator, Rank};
pub use room_state::{RoomPhase, RoomStateMachine, TimetableEntry};
pub use signal::{InboundSignal, OutboundSignal, SignalKind, SignalPayload, SignalScope, SignalSender};
pub use transport::{RealtimeTransport, TransportEvent, TransportLink, TransportSession};
#[cfg(test)]
pub use transport::{MockRealtimeTransport, MockTransportSession};

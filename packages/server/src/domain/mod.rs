//! Domain layer: sessions, connections, streams and recordings.
//!
//! Repository and MessagePusher are defined here as traits and implemented by
//! the infrastructure layer.

pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Connection, Recording, Session, Stream, TimetableEntry};
pub use error::{MessagePushError, RepositoryError, SessionDomainError, ValueObjectError};
pub use fanmeet_shared::protocol::Role;
pub use message_pusher::{MessagePusher, PusherChannel};
#[cfg(test)]
pub use message_pusher::MockMessagePusher;
pub use repository::SessionRepository;
pub use value_object::{
    ConnectionId, DisplayName, RecordingId, SessionId, StreamId, Timestamp,
};

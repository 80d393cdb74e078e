//! Participants: who is in the session and what the local client publishes.

use fanmeet_shared::protocol::{
    Role,
    websocket::{StreamDescriptor, StreamInfo},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection id issued by the transport; unique per connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who the local client is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub user_id: u64,
    pub role: Role,
}

impl Identity {
    pub fn host(display_name: impl Into<String>, user_id: u64) -> Self {
        Self {
            display_name: display_name.into(),
            user_id,
            role: Role::Host,
        }
    }

    pub fn fan(display_name: impl Into<String>, user_id: u64) -> Self {
        Self {
            display_name: display_name.into(),
            user_id,
            role: Role::Fan,
        }
    }
}

/// A remote participant's subscribed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub stream_id: String,
    pub audio_active: bool,
    pub video_active: bool,
}

/// A remote participant, known from its published stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub user_id: u64,
    pub role: Role,
    pub stream: RemoteStream,
}

impl Participant {
    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }
}

impl From<&StreamInfo> for Participant {
    fn from(info: &StreamInfo) -> Self {
        Self {
            connection_id: ConnectionId::new(info.connection.connection_id.clone()),
            display_name: info.connection.display_name.clone(),
            user_id: info.connection.user_id,
            role: info.connection.role,
            stream: RemoteStream {
                stream_id: info.stream_id.clone(),
                audio_active: info.audio_active,
                video_active: info.video_active,
            },
        }
    }
}

/// The local publishing handle.
///
/// Starts with audio off and video on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub stream_id: String,
    pub audio_active: bool,
    pub video_active: bool,
}

impl Publisher {
    pub fn new() -> Self {
        Self {
            stream_id: format!("str_{}", Uuid::new_v4().simple()),
            audio_active: false,
            video_active: true,
        }
    }

    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            stream_id: self.stream_id.clone(),
            audio_active: self.audio_active,
            video_active: self.video_active,
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Remote participants in arrival order.
///
/// Duplicates are not rejected; removal takes the first matching entry.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_stream_created(&mut self, participant: Participant) {
        tracing::debug!(
            "Participant '{}' ({}) joined",
            participant.display_name,
            participant.connection_id
        );
        self.participants.push(participant);
    }

    /// Remove the participant owning `stream_id`.
    pub fn on_stream_destroyed(&mut self, stream_id: &str) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.stream.stream_id == stream_id)?;
        Some(self.participants.remove(index))
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.connection_id == connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.get(connection_id).is_some()
    }

    pub fn find_by_name(&self, display_name: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.display_name == display_name)
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host())
    }

    pub fn fans(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.is_host())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}

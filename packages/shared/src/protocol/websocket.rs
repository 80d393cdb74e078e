//! WebSocket frames of the signaling relay.
//!
//! Every frame is a JSON text message tagged by `type`.

use serde::{Deserialize, Serialize};

use super::Role;

/// A connection as seen by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub connection_id: String,
    pub display_name: String,
    pub user_id: u64,
    pub role: Role,
    /// Unix timestamp (milliseconds)
    pub connected_at: i64,
}

/// Media flags of a stream, as announced by its publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub stream_id: String,
    pub audio_active: bool,
    pub video_active: bool,
}

/// A published stream together with the connection that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInfo {
    pub stream_id: String,
    pub connection: ConnectionInfo,
    pub audio_active: bool,
    pub video_active: bool,
    /// Unix timestamp (milliseconds)
    pub created_at: i64,
}

/// Frames sent from a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Relay a signal to the whole session, or only to `to` when present.
    Signal {
        kind: String,
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Vec<String>>,
    },
    Publish {
        stream: StreamDescriptor,
    },
    UpdateStream {
        stream: StreamDescriptor,
    },
    #[serde(rename_all = "camelCase")]
    Unpublish {
        stream_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Subscribe {
        stream_id: String,
    },
}

/// Frames sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// First frame after the upgrade: who we are and what is already published.
    Connected {
        connection: ConnectionInfo,
        streams: Vec<StreamInfo>,
    },
    StreamCreated {
        stream: StreamInfo,
    },
    #[serde(rename_all = "camelCase")]
    StreamDestroyed {
        stream_id: String,
        connection_id: String,
        reason: String,
    },
    /// A relayed signal; `from` is stamped by the relay, not by the sender.
    Signal {
        kind: String,
        data: serde_json::Value,
        from: ConnectionInfo,
    },
    Exception {
        name: String,
        message: String,
    },
}

//! Real-time transport abstraction.
//!
//! A transport connects this client to a session and then delivers
//! [`TransportEvent`]s over a channel. Outgoing operations are
//! fire-and-forget: they enqueue and return.

use async_trait::async_trait;
use fanmeet_shared::protocol::websocket::{ConnectionInfo, StreamDescriptor, StreamInfo};
use tokio::sync::mpsc;

use super::{error::TransportError, participant::Identity, signal::OutboundSignal};

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    StreamCreated(StreamInfo),
    StreamDestroyed {
        stream_id: String,
        connection_id: String,
        reason: String,
    },
    Signal {
        kind: String,
        data: serde_json::Value,
        from: ConnectionInfo,
    },
    /// A runtime problem reported by the transport; the session continues
    Exception { name: String, message: String },
    Disconnected { reason: String },
}

/// An established connection.
pub struct TransportLink {
    pub session: Box<dyn TransportSession>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
    /// This connection as the relay sees it
    pub local: ConnectionInfo,
    /// Streams published before we joined
    pub streams: Vec<StreamInfo>,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink")
            .field("local", &self.local)
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Join `session_id` as `identity`.
    async fn connect(
        &self,
        session_id: &str,
        identity: &Identity,
    ) -> Result<TransportLink, TransportError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportSession: Send + Sync {
    fn signal(&self, signal: OutboundSignal) -> Result<(), TransportError>;

    fn publish(&self, stream: StreamDescriptor) -> Result<(), TransportError>;

    /// Announce new media flags of the published stream
    fn update_stream(&self, stream: StreamDescriptor) -> Result<(), TransportError>;

    fn unpublish(&self, stream_id: &str) -> Result<(), TransportError>;

    fn subscribe(&self, stream_id: &str) -> Result<(), TransportError>;

    async fn disconnect(&self);
}

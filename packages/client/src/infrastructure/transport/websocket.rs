//! WebSocket を使った RealtimeTransport 実装
//!
//! ## 責務
//!
//! - `GET /ws?session_id&name&role&user_id` へのアップグレードと拒否ステータスの変換
//! - 最初の `connected` フレームの受信（自分の接続情報と既存ストリーム）
//! - 受信タスク: `ServerFrame` → `TransportEvent`
//! - 送信タスク: `ClientFrame` を JSON テキストとして書き込む

use async_trait::async_trait;
use fanmeet_shared::protocol::websocket::{
    ClientFrame, ConnectionInfo, ServerFrame, StreamDescriptor, StreamInfo,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::domain::{
    Identity, OutboundSignal, RealtimeTransport, TransportError, TransportEvent, TransportLink,
    TransportSession,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// fanmeet リレーへの WebSocket トランスポート
///
/// ## 使用例
///
/// ```ignore
/// let transport = WebSocketTransport::new("ws://127.0.0.1:8080/ws");
/// let link = transport.connect("fm-1", &Identity::fan("uaena", 7)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn connect_url(&self, session_id: &str, identity: &Identity) -> Result<String, TransportError> {
        let user_id = identity.user_id.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("session_id", session_id),
                ("name", identity.display_name.as_str()),
                ("role", identity.role.as_str()),
                ("user_id", user_id.as_str()),
            ],
        )
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(url.into())
    }
}

/// アップグレード拒否のステータスコードをエラーに変換
fn map_connect_error(error: WsError, session_id: &str) -> TransportError {
    match error {
        WsError::Http(response) => match response.status().as_u16() {
            409 => TransportError::HostAlreadyConnected,
            404 => TransportError::SessionNotFound(session_id.to_string()),
            410 => TransportError::SessionClosed,
            503 => TransportError::SessionFull,
            status => TransportError::Rejected(status),
        },
        other => TransportError::ConnectionFailed(other.to_string()),
    }
}

/// 最初の `connected` フレームを待つ
async fn await_connected(
    read: &mut SplitStream<Socket>,
) -> Result<(ConnectionInfo, Vec<StreamInfo>), TransportError> {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<ServerFrame>(text.as_str()) {
                    Ok(ServerFrame::Connected {
                        connection,
                        streams,
                    }) => Ok((connection, streams)),
                    Ok(other) => Err(TransportError::Handshake(format!(
                        "expected a connected frame, got {:?}",
                        other
                    ))),
                    Err(e) => Err(TransportError::Handshake(e.to_string())),
                };
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(TransportError::Handshake(e.to_string())),
        }
    }
    Err(TransportError::Handshake(
        "connection closed before the handshake".to_string(),
    ))
}

#[async_trait]
impl RealtimeTransport for WebSocketTransport {
    async fn connect(
        &self,
        session_id: &str,
        identity: &Identity,
    ) -> Result<TransportLink, TransportError> {
        let url = self.connect_url(session_id, identity)?;
        tracing::info!("Connecting to {}", self.url);

        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| map_connect_error(e, session_id))?;
        let (write, mut read) = socket.split();

        let (local, streams) = await_connected(&mut read).await?;
        tracing::info!(
            "Connected to session '{}' as {} ({} streams already published)",
            session_id,
            local.connection_id,
            streams.len()
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let reader = reader_loop(read, event_tx);
        let writer = writer_loop(write, outgoing_rx);

        Ok(TransportLink {
            session: Box::new(WebSocketSession {
                outgoing: outgoing_tx,
                reader,
                writer: Mutex::new(Some(writer)),
            }),
            events: event_rx,
            local,
            streams,
        })
    }
}

enum Outgoing {
    Frame(ClientFrame),
    Close,
}

/// Spawns a task that turns relay frames into transport events.
fn reader_loop(
    mut read: SplitStream<Socket>,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = loop {
            let message = match read.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break e.to_string();
                }
                None => break "connection closed".to_string(),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    tracing::info!("Relay closed the connection");
                    break frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by relay".to_string());
                }
                _ => continue,
            };

            let event = match serde_json::from_str::<ServerFrame>(text.as_str()) {
                Ok(ServerFrame::Connected { .. }) => {
                    tracing::debug!("Ignoring repeated connected frame");
                    continue;
                }
                Ok(ServerFrame::StreamCreated { stream }) => TransportEvent::StreamCreated(stream),
                Ok(ServerFrame::StreamDestroyed {
                    stream_id,
                    connection_id,
                    reason,
                }) => TransportEvent::StreamDestroyed {
                    stream_id,
                    connection_id,
                    reason,
                },
                Ok(ServerFrame::Signal { kind, data, from }) => {
                    TransportEvent::Signal { kind, data, from }
                }
                Ok(ServerFrame::Exception { name, message }) => {
                    TransportEvent::Exception { name, message }
                }
                Err(e) => TransportEvent::Exception {
                    name: "MalformedFrame".to_string(),
                    message: e.to_string(),
                },
            };
            if events.send(event).is_err() {
                return;
            }
        };
        let _ = events.send(TransportEvent::Disconnected { reason });
    })
}

/// Spawns a task that writes queued frames to the WebSocket.
fn writer_loop(
    mut write: SplitSink<Socket, Message>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = outgoing.recv().await {
            match item {
                Outgoing::Frame(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        tracing::warn!("Failed to send frame: {}", e);
                        break;
                    }
                }
                Outgoing::Close => {
                    if let Err(e) = write.close().await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                    break;
                }
            }
        }
    })
}

struct WebSocketSession {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    reader: JoinHandle<()>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketSession {
    fn send_frame(&self, frame: ClientFrame) -> Result<(), TransportError> {
        self.outgoing
            .send(Outgoing::Frame(frame))
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl TransportSession for WebSocketSession {
    fn signal(&self, signal: OutboundSignal) -> Result<(), TransportError> {
        tracing::debug!("Sending signal '{}'", signal.kind);
        self.send_frame(ClientFrame::Signal {
            kind: signal.kind.as_str().to_string(),
            data: signal.data,
            to: signal
                .to
                .map(|ids| ids.into_iter().map(|id| id.as_str().to_string()).collect()),
        })
    }

    fn publish(&self, stream: StreamDescriptor) -> Result<(), TransportError> {
        self.send_frame(ClientFrame::Publish { stream })
    }

    fn update_stream(&self, stream: StreamDescriptor) -> Result<(), TransportError> {
        self.send_frame(ClientFrame::UpdateStream { stream })
    }

    fn unpublish(&self, stream_id: &str) -> Result<(), TransportError> {
        self.send_frame(ClientFrame::Unpublish {
            stream_id: stream_id.to_string(),
        })
    }

    fn subscribe(&self, stream_id: &str) -> Result<(), TransportError> {
        self.send_frame(ClientFrame::Subscribe {
            stream_id: stream_id.to_string(),
        })
    }

    async fn disconnect(&self) {
        // stop reporting before the close so no Disconnected event follows a leave
        self.reader.abort();
        let _ = self.outgoing.send(Outgoing::Close);
        if let Some(writer) = self.writer.lock().await.take() {
            let _ = writer.await;
        }
        tracing::info!("Disconnected from relay");
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(writer) = self.writer.get_mut().take() {
            writer.abort();
        }
    }
}

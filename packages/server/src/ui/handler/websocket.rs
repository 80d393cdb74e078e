//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use fanmeet_shared::protocol::websocket::{ClientFrame, ServerFrame};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Connection, ConnectionId, Role, SessionId},
    ui::state::AppState,
    usecase::{ConnectError, ConnectRequest},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub session_id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub user_id: u64,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let request = ConnectRequest {
        session_id: query.session_id,
        display_name: query.name,
        user_id: query.user_id,
        role: query.role,
    };

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();

    match state
        .connect_participant_usecase
        .execute(request.clone(), tx)
        .await
    {
        Ok((session_id, connection)) => Ok(ws.on_upgrade(move |socket| {
            handle_socket(socket, state, session_id, connection, rx)
        })),
        Err(e) => {
            tracing::warn!(
                "Rejected connection of '{}' to session '{}': {}",
                request.display_name,
                request.session_id,
                e
            );
            Err(match e {
                ConnectError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                ConnectError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                ConnectError::SessionClosed => StatusCode::GONE,
                ConnectError::HostAlreadyConnected => StatusCode::CONFLICT,
                ConnectError::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }
}

/// Spawns a task that forwards frames queued for this connection to its WebSocket.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session_id: SessionId,
    connection: Connection,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();
    let connection_id = connection.id.clone();

    let state_clone = state.clone();
    let session_id_clone = session_id.clone();
    let connection_id_clone = connection_id.clone();

    // Spawn a task to receive frames from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_frame(&state_clone, &session_id_clone, &connection_id_clone, &text)
                        .await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state
        .disconnect_participant_usecase
        .execute(&session_id, &connection_id)
        .await
    {
        tracing::warn!("Failed to disconnect '{}': {}", connection_id, e);
    }
}

/// Parse one client frame and run the matching use case.
///
/// Failures are reported back to the sender as an `exception` frame; the
/// connection stays open.
async fn handle_frame(
    state: &AppState,
    session_id: &SessionId,
    connection_id: &ConnectionId,
    text: &str,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Malformed frame from '{}': {}", connection_id, e);
            push_exception(state, connection_id, "MalformedFrame", e.to_string()).await;
            return;
        }
    };

    let result = match frame {
        ClientFrame::Signal { kind, data, to } => {
            tracing::debug!("Signal '{}' from '{}'", kind, connection_id);
            state
                .relay_signal_usecase
                .execute(session_id, connection_id, kind, data, to)
                .await
                .map(|_| ())
                .map_err(|e| ("SignalError", e.to_string()))
        }
        ClientFrame::Publish { stream } => state
            .publish_stream_usecase
            .publish(session_id, connection_id, stream)
            .await
            .map(|_| ())
            .map_err(|e| ("PublishError", e.to_string())),
        ClientFrame::UpdateStream { stream } => state
            .publish_stream_usecase
            .update(session_id, connection_id, stream)
            .await
            .map_err(|e| ("PublishError", e.to_string())),
        ClientFrame::Unpublish { stream_id } => state
            .publish_stream_usecase
            .unpublish(session_id, connection_id, stream_id)
            .await
            .map_err(|e| ("PublishError", e.to_string())),
        ClientFrame::Subscribe { stream_id } => state
            .publish_stream_usecase
            .subscribe(session_id, connection_id, stream_id)
            .await
            .map_err(|e| ("SubscribeError", e.to_string())),
    };

    if let Err((name, message)) = result {
        tracing::warn!("{} for '{}': {}", name, connection_id, message);
        push_exception(state, connection_id, name, message).await;
    }
}

async fn push_exception(
    state: &AppState,
    connection_id: &ConnectionId,
    name: &str,
    message: String,
) {
    let frame = ServerFrame::Exception {
        name: name.to_string(),
        message,
    };
    match serde_json::to_string(&frame) {
        Ok(json) => {
            if let Err(e) = state.message_pusher.push_to(connection_id, &json).await {
                tracing::warn!("Failed to push exception to '{}': {}", connection_id, e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize exception frame: {}", e),
    }
}

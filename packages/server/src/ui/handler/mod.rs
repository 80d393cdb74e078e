//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{
    close_session, get_session_detail, get_sessions, health_check, open_session,
    start_recording, stop_recording,
};
pub use websocket::websocket_handler;

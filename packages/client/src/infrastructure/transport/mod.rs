//! リアルタイムトランスポートの実装
//!
//! ## 実装
//!
//! - `websocket`: fanmeet リレーに WebSocket で接続する実装
//! - `loopback`: プロセス内でシグナルを配送する実装（テスト・組み込み用）

pub mod loopback;
pub mod websocket;

pub use loopback::{LoopbackHub, RecordingCall};
pub use websocket::WebSocketTransport;

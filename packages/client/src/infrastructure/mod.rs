//! Infrastructure 層
//!
//! ドメイン層が定義する trait（`RealtimeTransport`, `FanmeetingApi`）の具体的な実装です。

pub mod api;
pub mod transport;

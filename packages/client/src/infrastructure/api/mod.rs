//! REST API クライアントの実装
//!
//! ## 実装
//!
//! - `http`: reqwest を使った fanmeet セッション API クライアント

pub mod http;

pub use http::HttpFanmeetingApi;

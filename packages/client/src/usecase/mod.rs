//! UseCase 層
//!
//! ドメインの各コーディネーターをトランスポートと REST API につなぎ、
//! 1 つのタスク上でイベントを順番に適用します。

pub mod config;
mod handlers;
pub mod session_manager;
pub mod signal_bus;
pub mod update;

pub use config::SessionConfig;
pub use session_manager::{ConnectionStatus, SessionConnectionManager, SessionState};
pub use signal_bus::{SignalBus, SignalHandler};
pub use update::{Reaction, SessionUpdate};

//! Interactive CLI front end: command parsing, display formatting and the
//! readline loop.

pub mod command;
pub mod error;
pub mod formatter;
pub mod runner;

pub use command::Command;
pub use error::ClientError;
pub use formatter::MessageFormatter;
pub use runner::{ClientOptions, run_client};

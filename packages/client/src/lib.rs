//! fanmeet client: session state synchronization and signaling orchestration.
//!
//! Turns the unordered broadcast signals of a real-time transport into a
//! consistent local view of a fan-meeting session: who is here, which corner
//! is running, who answered the quiz, whose microphone is on, who is focused
//! and what has been said in chat.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

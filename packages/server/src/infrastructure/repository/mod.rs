//! Repository の実装
//!
//! - `inmemory`: HashMap を使ったインメモリ実装（セッション状態は揮発性）

pub mod inmemory;

pub use inmemory::InMemorySessionRepository;

//! Room state: timetable and the current corner.
//!
//! Sequence 0 is the waiting room; sequence k > 0 is the k-th timetable
//! entry. Corner transitions are applied as received and may go backwards.

use fanmeet_shared::protocol::http::TimetableDto;

use super::{
    error::SignalError,
    signal::{NextCorner, OutboundSignal},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableEntry {
    pub category_name: String,
    pub sequence: u32,
    pub detail: String,
}

impl From<TimetableDto> for TimetableEntry {
    fn from(dto: TimetableDto) -> Self {
        Self {
            category_name: dto.category_name,
            sequence: dto.sequence,
            detail: dto.detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting room (sequence 0)
    Lobby,
    Corner(u32),
    /// The host closed the session
    Ended,
}

#[derive(Debug, Default)]
pub struct RoomStateMachine {
    sequence: u32,
    timetable: Vec<TimetableEntry>,
    ended: Option<String>,
}

impl RoomStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_timetable(&mut self, entries: Vec<TimetableEntry>) {
        self.timetable = entries;
    }

    /// Apply a received corner transition unconditionally.
    pub fn apply_next_corner(&mut self, sequence: u32) {
        if sequence < self.sequence {
            tracing::debug!(
                "Corner moves backwards from {} to {}",
                self.sequence,
                sequence
            );
        }
        self.sequence = sequence;
    }

    /// Host: move to `sequence` now and return the broadcast for everyone else.
    pub fn go_to_corner(&mut self, sequence: u32) -> Result<OutboundSignal, SignalError> {
        let signal = OutboundSignal::broadcast(&NextCorner { sequence })?;
        self.apply_next_corner(sequence);
        Ok(signal)
    }

    pub fn current_corner(&self) -> u32 {
        self.sequence
    }

    /// The timetable entry of the current corner, if the sequence names one
    pub fn current_entry(&self) -> Option<&TimetableEntry> {
        self.timetable.iter().find(|e| e.sequence == self.sequence)
    }

    pub fn is_waiting_room(&self) -> bool {
        self.sequence == 0
    }

    pub fn phase(&self) -> RoomPhase {
        if self.ended.is_some() {
            RoomPhase::Ended
        } else if self.sequence == 0 {
            RoomPhase::Lobby
        } else {
            RoomPhase::Corner(self.sequence)
        }
    }

    pub fn end(&mut self, reason: impl Into<String>) {
        self.ended = Some(reason.into());
    }

    pub fn ended(&self) -> Option<&str> {
        self.ended.as_deref()
    }

    pub fn timetable(&self) -> &[TimetableEntry] {
        &self.timetable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timetable() -> Vec<TimetableEntry> {
        ["오프닝", "Q&A", "포토타임"]
            .into_iter()
            .enumerate()
            .map(|(i, name)| TimetableEntry {
                category_name: name.to_string(),
                sequence: i as u32 + 1,
                detail: String::new(),
            })
            .collect()
    }

    #[test]
    fn test_starts_in_waiting_room() {
        // テスト項目: 初期状態は待機室 (sequence 0)
        // given (前提条件):
        let mut room = RoomStateMachine::new();

        // when (操作):
        room.load_timetable(timetable());

        // then (期待する結果):
        assert!(room.is_waiting_room());
        assert_eq!(room.phase(), RoomPhase::Lobby);
        assert!(room.current_entry().is_none());
    }

    #[test]
    fn test_next_corner_is_applied_even_when_going_backwards() {
        // テスト項目: nextCorner 2 の後に 1 を受け取ると 1 になる (単調性は強制しない)
        // given (前提条件):
        let mut room = RoomStateMachine::new();
        room.load_timetable(timetable());

        // when (操作):
        room.apply_next_corner(2);
        room.apply_next_corner(1);

        // then (期待する結果):
        assert_eq!(room.current_corner(), 1);
        assert_eq!(room.current_entry().unwrap().category_name, "오프닝");
    }

    #[test]
    fn test_go_to_corner_applies_locally_and_returns_broadcast() {
        // テスト項目: ホストのコーナー移動はローカルに即時反映され、ブロードキャストが返る
        // given (前提条件):
        let mut room = RoomStateMachine::new();

        // when (操作):
        let signal = room.go_to_corner(3).unwrap();

        // then (期待する結果):
        assert_eq!(room.phase(), RoomPhase::Corner(3));
        assert_eq!(signal.data, serde_json::json!({"sequence": 3}));
        assert!(signal.is_broadcast());
    }

    #[test]
    fn test_end_is_terminal_phase() {
        // テスト項目: セッション終了後のフェーズは Ended
        // given (前提条件):
        let mut room = RoomStateMachine::new();
        room.apply_next_corner(2);

        // when (操作):
        room.end("host closed the session");

        // then (期待する結果):
        assert_eq!(room.phase(), RoomPhase::Ended);
        assert_eq!(room.ended(), Some("host closed the session"));
    }
}

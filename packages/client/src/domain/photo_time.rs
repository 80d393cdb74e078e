//! Guided photo sequence: a fixed number of shots, each preceded by a countdown.
//!
//! The countdown runs on a tokio task that reports [`PhotoTimerEvent`]s
//! through a callback. Every scheduled countdown gets a new generation; events
//! of an older generation are ignored when applied, so a cancelled countdown
//! never fires into the state.

use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;

use super::{error::PhotoError, participant::ConnectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoTimerEvent {
    /// Whole seconds left until the shot
    Tick { generation: u64, remaining: u32 },
    /// The deadline passed: the shot is being taken
    Captured { generation: u64 },
    /// The capture indicator is over
    CaptureCleared { generation: u64 },
}

impl PhotoTimerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            PhotoTimerEvent::Tick { generation, .. }
            | PhotoTimerEvent::Captured { generation }
            | PhotoTimerEvent::CaptureCleared { generation } => *generation,
        }
    }
}

#[derive(Debug)]
pub struct PhotoTimeCoordinator {
    total_shots: u32,
    countdown: Duration,
    capture_indicator: Duration,
    sequence: u32,
    countdown_remaining: Option<u32>,
    capturing: bool,
    advancing: bool,
    ended: bool,
    active_recording_id: Option<String>,
    partner: Option<ConnectionId>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

fn whole_seconds(millis: i64) -> u32 {
    u32::try_from(millis.max(0).saturating_add(999) / 1000).unwrap_or(u32::MAX)
}

/// Milliseconds left on a countdown of `countdown_ms` started at `now_ms`.
///
/// A deadline only shortens the countdown when it falls within one countdown
/// from now. A missing deadline, or one skewed out of that window by the
/// peers' clocks, runs the full countdown from receipt.
fn remaining_millis(deadline_ms: Option<i64>, now_ms: i64, countdown_ms: i64) -> i64 {
    match deadline_ms.map(|deadline| deadline.saturating_sub(now_ms)) {
        Some(left) if (0..=countdown_ms).contains(&left) => left,
        _ => countdown_ms,
    }
}

impl PhotoTimeCoordinator {
    pub fn new(total_shots: u32, countdown: Duration, capture_indicator: Duration) -> Self {
        Self {
            total_shots,
            countdown,
            capture_indicator,
            sequence: 0,
            countdown_remaining: None,
            capturing: false,
            advancing: false,
            ended: false,
            active_recording_id: None,
            partner: None,
            generation: 0,
            timer: None,
        }
    }

    /// Host: may the next shot start? Returns its sequence.
    pub fn check_advance(&self) -> Result<u32, PhotoError> {
        if self.ended {
            return Err(PhotoError::Ended);
        }
        if self.sequence >= self.total_shots {
            return Err(PhotoError::AllShotsTaken(self.total_shots));
        }
        if self.advancing || self.is_counting_down() {
            return Err(PhotoError::CountdownRunning);
        }
        Ok(self.sequence + 1)
    }

    /// Mark that a shot is being prepared (recording start in flight).
    pub fn begin_advance(&mut self) {
        self.advancing = true;
    }

    pub fn end_advance(&mut self) {
        self.advancing = false;
    }

    /// Apply a received shot number. The sequence only moves forward.
    pub fn apply_next_photo(&mut self, sequence: u32) -> bool {
        if sequence <= self.sequence {
            tracing::debug!(
                "Ignoring nextPhoto {} (current shot is {})",
                sequence,
                self.sequence
            );
            return false;
        }
        self.sequence = sequence;
        true
    }

    /// Schedule a countdown, replacing any running one. With a `deadline_ms`
    /// (Unix epoch milliseconds) it ends at that deadline when it is at most
    /// one countdown away. Returns the generation of the new countdown.
    pub fn start_countdown<F>(&mut self, deadline_ms: Option<i64>, now_ms: i64, notify: F) -> u64
    where
        F: Fn(PhotoTimerEvent) + Send + 'static,
    {
        self.abort_timer();
        self.generation += 1;
        let generation = self.generation;
        let countdown_ms = i64::try_from(self.countdown.as_millis()).unwrap_or(i64::MAX);
        let mut remaining_ms = remaining_millis(deadline_ms, now_ms, countdown_ms);
        let capture_indicator = self.capture_indicator;

        self.countdown_remaining = Some(whole_seconds(remaining_ms));
        self.capturing = false;

        self.timer = Some(tokio::spawn(async move {
            loop {
                let seconds = whole_seconds(remaining_ms);
                if seconds == 0 {
                    break;
                }
                // sleep to the next whole-second boundary
                let step = remaining_ms - (seconds as i64 - 1) * 1000;
                tokio::time::sleep(Duration::from_millis(step as u64)).await;
                remaining_ms -= step;
                let seconds = whole_seconds(remaining_ms);
                if seconds > 0 {
                    notify(PhotoTimerEvent::Tick {
                        generation,
                        remaining: seconds,
                    });
                }
            }
            notify(PhotoTimerEvent::Captured { generation });
            tokio::time::sleep(capture_indicator).await;
            notify(PhotoTimerEvent::CaptureCleared { generation });
        }));
        generation
    }

    /// Apply a timer event; returns false for a stale generation.
    pub fn apply_timer_event(&mut self, event: PhotoTimerEvent) -> bool {
        if event.generation() != self.generation {
            tracing::debug!(
                "Dropping stale timer event of generation {} (current {})",
                event.generation(),
                self.generation
            );
            return false;
        }
        match event {
            PhotoTimerEvent::Tick { remaining, .. } => {
                self.countdown_remaining = Some(remaining);
            }
            PhotoTimerEvent::Captured { .. } => {
                self.countdown_remaining = None;
                self.capturing = true;
            }
            PhotoTimerEvent::CaptureCleared { .. } => {
                self.capturing = false;
                self.timer = None;
            }
        }
        true
    }

    /// Host: may the photo corner end?
    pub fn check_finish(&self) -> Result<(), PhotoError> {
        if self.ended {
            return Err(PhotoError::Ended);
        }
        if self.sequence < self.total_shots {
            return Err(PhotoError::ShotsRemaining {
                taken: self.sequence,
                total: self.total_shots,
            });
        }
        if self.advancing || self.is_counting_down() {
            return Err(PhotoError::CountdownRunning);
        }
        Ok(())
    }

    pub fn apply_end_photo(&mut self) {
        self.cancel();
        self.ended = true;
    }

    /// Stop any running countdown; its pending events become stale.
    pub fn cancel(&mut self) {
        self.abort_timer();
        self.generation += 1;
        self.countdown_remaining = None;
        self.capturing = false;
        self.advancing = false;
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    pub fn set_recording(&mut self, record_id: String) {
        self.active_recording_id = Some(record_id);
    }

    pub fn take_recording(&mut self) -> Option<String> {
        self.active_recording_id.take()
    }

    pub fn active_recording_id(&self) -> Option<&str> {
        self.active_recording_id.as_deref()
    }

    /// Host: pick a random fan to stand beside the host
    pub fn pick_partner<R: Rng>(
        &mut self,
        fans: &[ConnectionId],
        rng: &mut R,
    ) -> Result<ConnectionId, PhotoError> {
        if fans.is_empty() {
            return Err(PhotoError::NoFans);
        }
        let partner = fans[rng.random_range(0..fans.len())].clone();
        self.partner = Some(partner.clone());
        Ok(partner)
    }

    pub fn partner(&self) -> Option<&ConnectionId> {
        self.partner.as_ref()
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn total_shots(&self) -> u32 {
        self.total_shots
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown_remaining
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown_remaining.is_some() || self.capturing
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for PhotoTimeCoordinator {
    fn drop(&mut self) {
        self.abort_timer();
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use tokio::sync::mpsc;

    use super::*;

    fn coordinator() -> PhotoTimeCoordinator {
        PhotoTimeCoordinator::new(4, Duration::from_secs(5), Duration::from_millis(1500))
    }

    fn collector() -> (
        impl Fn(PhotoTimerEvent) + Send + 'static,
        mpsc::UnboundedReceiver<PhotoTimerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            move |event| {
                let _ = tx.send(event);
            },
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_then_captures_then_clears() {
        // テスト項目: カウントダウンは 4,3,2,1 と進み、撮影後 1.5 秒で撮影表示が消える
        // given (前提条件):
        let mut photo = coordinator();
        let (notify, mut rx) = collector();

        // when (操作):
        let generation = photo.start_countdown(Some(5_000), 0, notify);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            photo.apply_timer_event(event);
            events.push(event);
            if matches!(event, PhotoTimerEvent::CaptureCleared { .. }) {
                break;
            }
        }

        // then (期待する結果):
        let remaining: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                PhotoTimerEvent::Tick { remaining, .. } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1]);
        assert_eq!(
            &events[4..],
            &[
                PhotoTimerEvent::Captured { generation },
                PhotoTimerEvent::CaptureCleared { generation }
            ]
        );
        assert!(!photo.is_counting_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_uses_absolute_deadline() {
        // テスト項目: 遅れて届いたタイマーは締め切りまでの残り時間から始まる
        // given (前提条件):
        let mut photo = coordinator();
        let (notify, _rx) = collector();

        // when (操作):
        photo.start_countdown(Some(10_000), 7_500, notify);

        // then (期待する結果):
        assert_eq!(photo.countdown_remaining(), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_without_deadline_runs_from_receipt() {
        // テスト項目: 締め切りのない startPhotoTimer は受信時点から 5 秒のカウントダウンになる
        // given (前提条件):
        let mut photo = coordinator();
        let (notify, _rx) = collector();

        // when (操作):
        photo.start_countdown(None, 1_700_000_000_000, notify);

        // then (期待する結果):
        assert_eq!(photo.countdown_remaining(), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skewed_deadline_falls_back_to_full_countdown() {
        // テスト項目: 時計のずれで締め切りが過去や 5 秒より先になっても 5 秒のカウントダウンになる
        // given (前提条件):
        let mut photo = coordinator();
        let (ahead, _rx1) = collector();
        let (behind, _rx2) = collector();

        // when (操作):
        photo.start_countdown(Some(1_000_005_000), 1_000_015_000, ahead);
        let from_ahead = photo.countdown_remaining();
        photo.start_countdown(Some(1_000_060_000), 1_000_000_000, behind);
        let from_behind = photo.countdown_remaining();

        // then (期待する結果):
        assert_eq!(from_ahead, Some(5));
        assert_eq!(from_behind, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_deadlines_do_not_overflow() {
        // テスト項目: i64 の最小値・最大値の締め切りでもパニックせず 5 秒のカウントダウンになる
        // given (前提条件):
        let mut photo = coordinator();
        let (min, _rx1) = collector();
        let (max, _rx2) = collector();

        // when (操作):
        photo.start_countdown(Some(i64::MIN), 1_700_000_000_000, min);
        let from_min = photo.countdown_remaining();
        photo.start_countdown(Some(i64::MAX), -1_700_000_000_000, max);
        let from_max = photo.countdown_remaining();

        // then (期待する結果):
        assert_eq!(from_min, Some(5));
        assert_eq!(from_max, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarted_countdown_makes_old_events_stale() {
        // テスト項目: カウントダウンを再開すると古い世代のイベントは無視される
        // given (前提条件):
        let mut photo = coordinator();
        let (first, _rx1) = collector();
        let (second, _rx2) = collector();
        let old = photo.start_countdown(Some(5_000), 0, first);

        // when (操作):
        let new = photo.start_countdown(None, 0, second);
        let stale_applied = photo.apply_timer_event(PhotoTimerEvent::Captured { generation: old });

        // then (期待する結果):
        assert_ne!(old, new);
        assert!(!stale_applied);
        assert!(!photo.is_capturing());
        assert_eq!(photo.countdown_remaining(), Some(5));
    }

    #[test]
    fn test_sequence_is_strictly_increasing() {
        // テスト項目: 撮影番号は増える方向にしか進まない
        // given (前提条件):
        let mut photo = coordinator();

        // when (操作):
        let first = photo.apply_next_photo(1);
        let duplicate = photo.apply_next_photo(1);
        let second = photo.apply_next_photo(2);
        let backwards = photo.apply_next_photo(1);

        // then (期待する結果):
        assert!(first && second);
        assert!(!duplicate && !backwards);
        assert_eq!(photo.sequence(), 2);
    }

    #[test]
    fn test_advance_and_finish_guards() {
        // テスト項目: 4 枚撮り終えるまで終了できず、撮り終えたら次の撮影はできない
        // given (前提条件):
        let mut photo = coordinator();

        // when (操作):
        let early_finish = photo.check_finish();
        for sequence in 1..=4 {
            assert_eq!(photo.check_advance(), Ok(sequence));
            photo.apply_next_photo(sequence);
        }
        let fifth = photo.check_advance();
        let finish = photo.check_finish();
        photo.apply_end_photo();

        // then (期待する結果):
        assert_eq!(early_finish, Err(PhotoError::ShotsRemaining { taken: 0, total: 4 }));
        assert_eq!(fifth, Err(PhotoError::AllShotsTaken(4)));
        assert_eq!(finish, Ok(()));
        assert!(photo.is_ended());
        assert_eq!(photo.check_advance(), Err(PhotoError::Ended));
    }

    #[test]
    fn test_advance_rejected_while_recording_start_is_pending() {
        // テスト項目: 録画開始の待機中は次の撮影を始められない
        // given (前提条件):
        let mut photo = coordinator();

        // when (操作):
        photo.begin_advance();
        let pending = photo.check_advance();
        photo.end_advance();

        // then (期待する結果):
        assert_eq!(pending, Err(PhotoError::CountdownRunning));
        assert_eq!(photo.check_advance(), Ok(1));
    }

    #[test]
    fn test_pick_partner_needs_a_fan() {
        // テスト項目: ファンがいなければパートナーは選べず、いれば候補から選ばれる
        // given (前提条件):
        let mut photo = coordinator();
        let mut rng = StdRng::seed_from_u64(3);
        let fans = vec![ConnectionId::from("con_a"), ConnectionId::from("con_b")];

        // when (操作):
        let none = photo.pick_partner(&[], &mut rng);
        let picked = photo.pick_partner(&fans, &mut rng).unwrap();

        // then (期待する結果):
        assert_eq!(none, Err(PhotoError::NoFans));
        assert!(fans.contains(&picked));
        assert_eq!(photo.partner(), Some(&picked));
    }
}

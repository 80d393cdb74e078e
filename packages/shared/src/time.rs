//! Time-related utilities with clock abstraction for testability.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{FixedOffset, LocalResult, TimeZone, Utc};

/// Offset of Korea Standard Time (UTC+9) in seconds.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        get_timestamp_millis()
    }
}

/// Clock for tests: returns the time it was last set to.
#[derive(Debug, Default)]
pub struct FixedClock {
    fixed_time: AtomicI64,
}

impl FixedClock {
    /// Create a new fixed clock with the given timestamp
    pub fn new(fixed_time_millis: i64) -> Self {
        Self {
            fixed_time: AtomicI64::new(fixed_time_millis),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.fixed_time.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, fixed_time_millis: i64) {
        self.fixed_time.store(fixed_time_millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.fixed_time.load(Ordering::SeqCst)
    }
}

/// Get current Unix timestamp (milliseconds)
pub fn get_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to KST RFC 3339 format.
///
/// Out-of-range timestamps are rendered as the raw millisecond value.
pub fn timestamp_to_kst_rfc3339(timestamp_millis: i64) -> String {
    let Some(kst) = FixedOffset::east_opt(KST_OFFSET_SECS) else {
        return timestamp_millis.to_string();
    };
    match kst.timestamp_millis_opt(timestamp_millis) {
        LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => timestamp_millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_non_zero_timestamp() {
        // テスト項目: SystemClock が 0 以外のタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let timestamp = clock.now_millis();

        // then (期待する結果):
        assert!(timestamp > 0);
    }

    #[test]
    fn test_fixed_clock_returns_fixed_timestamp() {
        // テスト項目: FixedClock が固定されたタイムスタンプを返す
        // given (前提条件):
        let fixed_time = 1234567890123;
        let clock = FixedClock::new(fixed_time);

        // when (操作):
        let timestamp1 = clock.now_millis();
        let timestamp2 = clock.now_millis();

        // then (期待する結果):
        assert_eq!(timestamp1, fixed_time);
        assert_eq!(timestamp2, fixed_time);
    }

    #[test]
    fn test_fixed_clock_advance_and_set() {
        // テスト項目: FixedClock を進めたり任意の時刻に設定したりできる
        // given (前提条件):
        let clock = FixedClock::new(1_000);

        // when (操作):
        clock.advance(600);
        let advanced = clock.now_millis();
        clock.set(42);

        // then (期待する結果):
        assert_eq!(advanced, 1_600);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_timestamp_to_kst_rfc3339_format() {
        // テスト項目: タイムスタンプが KST の RFC 3339 形式に変換される
        // given (前提条件):
        // 2023-01-01 00:00:00 KST in milliseconds
        let timestamp = 1672498800000;

        // when (操作):
        let result = timestamp_to_kst_rfc3339(timestamp);

        // then (期待する結果):
        assert!(result.starts_with("2023-01-01T00:00:00"));
        assert!(result.ends_with("+09:00"));
    }

    #[test]
    fn test_timestamp_to_kst_rfc3339_out_of_range() {
        // テスト項目: 範囲外のタイムスタンプはそのまま数値で表示される
        // given (前提条件):
        let timestamp = i64::MAX;

        // when (操作):
        let result = timestamp_to_kst_rfc3339(timestamp);

        // then (期待する結果):
        assert_eq!(result, i64::MAX.to_string());
    }
}

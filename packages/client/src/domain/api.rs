//! REST collaborator: session lifecycle and photo recordings.

use async_trait::async_trait;

use super::{error::ApiError, room_state::TimetableEntry};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FanmeetingApi: Send + Sync {
    /// Open (or re-open) the session and fetch its timetable.
    async fn open_session(&self, session_id: &str) -> Result<Vec<TimetableEntry>, ApiError>;

    async fn close_session(&self, session_id: &str) -> Result<(), ApiError>;

    /// Start recording a shot; returns the recording id.
    async fn start_recording(&self, fanmeeting_id: &str) -> Result<String, ApiError>;

    async fn stop_recording(&self, record_id: &str, sequence: u32) -> Result<(), ApiError>;
}

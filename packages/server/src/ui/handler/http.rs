//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fanmeet_shared::protocol::http::{
    ErrorBody, OpenSessionRequest, OpenSessionResponse, RecordResponse, RecordStartRequest,
    RecordStopRequest, SessionSummaryDto, TimetableDto,
};

use crate::{
    ui::state::AppState,
    usecase::{RecordingError, SessionError},
};

/// Error response: a status code with an `{errorCode, errorMessage}` body.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.code.to_string(),
            error_message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        let (status, code) = match &error {
            SessionError::InvalidSessionId(_) => (StatusCode::BAD_REQUEST, "SESSION-001"),
            SessionError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION-002"),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

impl From<RecordingError> for ApiError {
    fn from(error: RecordingError) -> Self {
        let (status, code) = match &error {
            RecordingError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "RECORD-001"),
            RecordingError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "RECORD-002"),
            RecordingError::SessionClosed(_) => (StatusCode::GONE, "RECORD-003"),
            RecordingError::RecordingNotFound(_) => (StatusCode::NOT_FOUND, "RECORD-004"),
            RecordingError::AlreadyStopped(_) => (StatusCode::CONFLICT, "RECORD-005"),
        };
        Self {
            status,
            code,
            message: error.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Open (or re-open) a session and return its timetable
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<OpenSessionResponse>, ApiError> {
    let session = state
        .open_session_usecase
        .execute(request.custom_session_id)
        .await?;

    // Domain Model から DTO への変換
    Ok(Json(OpenSessionResponse {
        session_id: session.id.as_str().to_string(),
        timetables: session.timetable.iter().map(TimetableDto::from).collect(),
    }))
}

/// Close a session; no further connections are accepted
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.close_session_usecase.execute(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get list of sessions
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummaryDto>> {
    let sessions = state.get_sessions_usecase.list().await;
    Json(sessions.iter().map(SessionSummaryDto::from).collect())
}

/// Get session detail by ID
pub async fn get_session_detail(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummaryDto>, ApiError> {
    let session = state.get_sessions_usecase.get(session_id).await?;
    Ok(Json(SessionSummaryDto::from(&session)))
}

/// Start recording the current photo shot
pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordStartRequest>,
) -> Result<Json<RecordResponse>, ApiError> {
    let recording = state
        .recording_usecase
        .start(request.fanmeeting_id)
        .await?;
    Ok(Json(RecordResponse {
        record_id: recording.id.into_string(),
    }))
}

/// Stop a recording and attach the shot sequence
pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordStopRequest>,
) -> Result<Json<RecordResponse>, ApiError> {
    let recording = state
        .recording_usecase
        .stop(request.record_id, request.sequence)
        .await?;
    Ok(Json(RecordResponse {
        record_id: recording.id.into_string(),
    }))
}

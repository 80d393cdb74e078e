//! reqwest を使った FanmeetingApi 実装
//!
//! 非 2xx のレスポンスは `{errorCode, errorMessage}` を `ApiError` に変換します。
//! ボディが読めない場合は `HTTP-<status>`、通信自体の失敗は `NETWORK` になります。

use async_trait::async_trait;
use fanmeet_shared::protocol::http::{
    ErrorBody, OpenSessionRequest, OpenSessionResponse, RecordResponse, RecordStartRequest,
    RecordStopRequest,
};
use serde::de::DeserializeOwned;

use crate::domain::{ApiError, FanmeetingApi, TimetableEntry};

#[derive(Debug, Clone)]
pub struct HttpFanmeetingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpFanmeetingApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn network_error(error: reqwest::Error) -> ApiError {
    ApiError::new("NETWORK", error.to_string())
}

/// Turn a non-2xx response into an `ApiError`
async fn error_from(response: reqwest::Response) -> ApiError {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => ApiError::new(body.error_code, body.error_message),
        Err(_) => ApiError::new(
            format!("HTTP-{}", status.as_u16()),
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string(),
        ),
    }
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    response.json::<T>().await.map_err(network_error)
}

#[async_trait]
impl FanmeetingApi for HttpFanmeetingApi {
    async fn open_session(&self, session_id: &str) -> Result<Vec<TimetableEntry>, ApiError> {
        let response = self
            .client
            .post(self.url("/api/sessions/open"))
            .json(&OpenSessionRequest {
                custom_session_id: session_id.to_string(),
            })
            .send()
            .await
            .map_err(network_error)?;
        let opened: OpenSessionResponse = parse(response).await?;
        tracing::debug!(
            "Opened session '{}' with {} corners",
            opened.session_id,
            opened.timetables.len()
        );
        Ok(opened
            .timetables
            .into_iter()
            .map(TimetableEntry::from)
            .collect())
    }

    async fn close_session(&self, session_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/sessions/{}", session_id)))
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }
        Ok(())
    }

    async fn start_recording(&self, fanmeeting_id: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/api/sessions/record"))
            .json(&RecordStartRequest {
                fanmeeting_id: fanmeeting_id.to_string(),
            })
            .send()
            .await
            .map_err(network_error)?;
        let record: RecordResponse = parse(response).await?;
        Ok(record.record_id)
    }

    async fn stop_recording(&self, record_id: &str, sequence: u32) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/api/sessions/record/stop"))
            .json(&RecordStopRequest {
                record_id: record_id.to_string(),
                sequence,
            })
            .send()
            .await
            .map_err(network_error)?;
        let _: RecordResponse = parse(response).await?;
        Ok(())
    }
}

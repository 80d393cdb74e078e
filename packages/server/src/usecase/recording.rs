//! UseCase: 撮影（録画）の開始と停止
//!
//! フォトタイムの各ショットごとにホストが録画を開始し、カウントダウン終了後
//! またはホストの手動操作で停止する。停止時にはショットのシーケンス番号を記録する。

use std::sync::Arc;

use fanmeet_shared::time::Clock;

use crate::domain::{
    Recording, RecordingId, RepositoryError, SessionId, SessionRepository, Timestamp,
};

use super::error::RecordingError;

/// 録画のユースケース
pub struct RecordingUseCase {
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl RecordingUseCase {
    pub fn new(repository: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 録画を開始し、新しい録画を返す
    pub async fn start(&self, fanmeeting_id: String) -> Result<Recording, RecordingError> {
        let session_id = SessionId::new(fanmeeting_id)
            .map_err(|e| RecordingError::InvalidParameter(e.to_string()))?;
        let session = self
            .repository
            .get_session(&session_id)
            .await
            .map_err(|_| RecordingError::SessionNotFound(session_id.as_str().to_string()))?;
        if session.closed {
            return Err(RecordingError::SessionClosed(session_id.into_string()));
        }

        let recording = Recording::start(session_id, Timestamp::new(self.clock.now_millis()));
        self.repository.save_recording(recording.clone()).await;
        tracing::info!(
            "Recording '{}' started for session '{}'",
            recording.id,
            recording.session_id
        );
        Ok(recording)
    }

    /// 録画を停止し、ショットのシーケンスを記録する
    pub async fn stop(
        &self,
        record_id: String,
        sequence: u32,
    ) -> Result<Recording, RecordingError> {
        let recording_id = RecordingId::new(record_id)
            .map_err(|e| RecordingError::InvalidParameter(e.to_string()))?;
        let mut recording = self
            .repository
            .get_recording(&recording_id)
            .await
            .map_err(|e| match e {
                RepositoryError::RecordingNotFound(id) => RecordingError::RecordingNotFound(id),
                other => RecordingError::InvalidParameter(other.to_string()),
            })?;
        if recording.stopped.is_some() {
            return Err(RecordingError::AlreadyStopped(recording_id.into_string()));
        }

        recording.stopped = Some((sequence, Timestamp::new(self.clock.now_millis())));
        self.repository.save_recording(recording.clone()).await;
        tracing::info!(
            "Recording '{}' stopped at shot {}",
            recording.id,
            sequence
        );
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Session, infrastructure::repository::InMemorySessionRepository};
    use fanmeet_shared::time::FixedClock;

    async fn create_usecase() -> (RecordingUseCase, Arc<FixedClock>) {
        let repository = Arc::new(InMemorySessionRepository::default());
        repository
            .open_session(Session::new(
                SessionId::new("fm-1".to_string()).unwrap(),
                vec![],
                10,
                Timestamp::new(0),
            ))
            .await;
        let clock = Arc::new(FixedClock::new(1_000));
        (RecordingUseCase::new(repository, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_start_and_stop_recording() {
        // テスト項目: 録画を開始して停止すると、シーケンスと停止時刻が記録される
        // given (前提条件):
        let (usecase, clock) = create_usecase().await;
        let recording = usecase.start("fm-1".to_string()).await.unwrap();

        // when (操作):
        clock.advance(5_000);
        let stopped = usecase
            .stop(recording.id.as_str().to_string(), 3)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(stopped.started_at, Timestamp::new(1_000));
        assert_eq!(stopped.stopped, Some((3, Timestamp::new(6_000))));
    }

    #[tokio::test]
    async fn test_stop_twice_is_rejected() {
        // テスト項目: 停止済みの録画を再度停止するとエラーになる
        // given (前提条件):
        let (usecase, _) = create_usecase().await;
        let recording = usecase.start("fm-1".to_string()).await.unwrap();
        let id = recording.id.as_str().to_string();
        usecase.stop(id.clone(), 1).await.unwrap();

        // when (操作):
        let result = usecase.stop(id.clone(), 1).await;

        // then (期待する結果):
        assert_eq!(result, Err(RecordingError::AlreadyStopped(id)));
    }

    #[tokio::test]
    async fn test_start_for_unknown_session_or_recording() {
        // テスト項目: 存在しないセッション・録画に対する操作はエラーになる
        // given (前提条件):
        let (usecase, _) = create_usecase().await;

        // when (操作):
        let start = usecase.start("fm-404".to_string()).await;
        let stop = usecase.stop("rec_unknown".to_string(), 1).await;

        // then (期待する結果):
        assert_eq!(
            start,
            Err(RecordingError::SessionNotFound("fm-404".to_string()))
        );
        assert_eq!(
            stop,
            Err(RecordingError::RecordingNotFound("rec_unknown".to_string()))
        );
    }
}

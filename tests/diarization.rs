//! Diarization Integration Tests
//!
//! Tests for the submit/poll loop against a scripted job API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use call_feedback::adapters::{DiarizationApi, FetchableRef};
use call_feedback::core::{AnalysisError, DiarizationError, DiarizationJobClient, PollPolicy};
use call_feedback::domain::{DiarizationSegment, ErrorKind, JobStatusResponse};

/// Job API replaying a fixed sequence of status payloads
struct ScriptedApi {
    statuses: Mutex<VecDeque<serde_json::Value>>,
    polls: Mutex<u32>,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedApi {
    fn new(statuses: Vec<serde_json::Value>) -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(statuses.into()),
            polls: Mutex::new(0),
            submitted: Mutex::new(Vec::new()),
        })
    }

    fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl DiarizationApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit(&self, audio: &FetchableRef) -> Result<String> {
        self.submitted.lock().unwrap().push(audio.url().to_string());
        Ok("job-123".to_string())
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        assert_eq!(job_id, "job-123");
        *self.polls.lock().unwrap() += 1;

        // the last scripted status repeats forever
        let mut statuses = self.statuses.lock().unwrap();
        let raw = if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap()
        };
        Ok(JobStatusResponse::from_json(raw)?)
    }
}

fn fast_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5))
}

fn audio_ref() -> FetchableRef {
    FetchableRef::new("https://acct.blob.core.windows.net/audio-files/call.wav?sig=abc")
}

#[tokio::test]
async fn test_pending_pending_succeeded() {
    let api = ScriptedApi::new(vec![
        json!({ "status": "pending" }),
        json!({ "status": "running" }),
        json!({
            "status": "succeeded",
            "output": { "diarization": [
                { "speaker": "SPEAKER_00", "start": 0.5, "end": 2.25 },
                { "speaker": "SPEAKER_01", "start": 2.25, "end": 4.0 }
            ]}
        }),
    ]);
    let client = DiarizationJobClient::new(api.clone(), fast_policy());

    let segments = client.diarize(&audio_ref()).await.unwrap();
    assert_eq!(
        segments,
        vec![
            DiarizationSegment::new("SPEAKER_00", 0.5, 2.25),
            DiarizationSegment::new("SPEAKER_01", 2.25, 4.0),
        ]
    );
    assert_eq!(api.polls(), 3);
    assert_eq!(api.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_succeeded_without_diarization_is_malformed() {
    let api = ScriptedApi::new(vec![json!({ "status": "succeeded", "output": {} })]);
    let client = DiarizationJobClient::new(api, fast_policy());

    let err = client.diarize(&audio_ref()).await.unwrap_err();
    assert!(matches!(err, DiarizationError::MalformedResult { .. }), "{}", err);
}

#[tokio::test]
async fn test_failed_job_carries_payload() {
    let api = ScriptedApi::new(vec![
        json!({ "status": "pending" }),
        json!({ "status": "failed", "error": "media could not be downloaded" }),
    ]);
    let client = DiarizationJobClient::new(api, fast_policy());

    let err = client.diarize(&audio_ref()).await.unwrap_err();
    match err {
        DiarizationError::Failed { ref payload } => {
            assert!(payload.contains("media could not be downloaded"))
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_cancelled_spelling_is_canceled() {
    let api = ScriptedApi::new(vec![json!({ "status": "cancelled" })]);
    let client = DiarizationJobClient::new(api, fast_policy());

    let err = client.diarize(&audio_ref()).await.unwrap_err();
    assert!(matches!(err, DiarizationError::Canceled { .. }));

    let err: AnalysisError = err.into();
    assert_eq!(err.kind(), ErrorKind::Diarization);
}

#[tokio::test]
async fn test_max_wait_gives_timeout() {
    let api = ScriptedApi::new(vec![json!({ "status": "pending" })]);
    let policy = fast_policy().with_max_wait(Duration::from_millis(40));
    let client = DiarizationJobClient::new(api.clone(), policy);

    let err = client.diarize(&audio_ref()).await.unwrap_err();
    assert!(matches!(err, DiarizationError::TimedOut { .. }), "{}", err);
    assert!(api.polls() >= 2);

    let err: AnalysisError = err.into();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_poll_transport_error_is_fatal() {
    struct BrokenApi;

    #[async_trait]
    impl DiarizationApi for BrokenApi {
        fn name(&self) -> &str {
            "broken"
        }

        async fn submit(&self, _audio: &FetchableRef) -> Result<String> {
            Ok("job-1".to_string())
        }

        async fn job_status(&self, _job_id: &str) -> Result<JobStatusResponse> {
            anyhow::bail!("connection reset by peer")
        }
    }

    let client = DiarizationJobClient::new(Arc::new(BrokenApi), fast_policy());
    let err = client.diarize(&audio_ref()).await.unwrap_err();
    assert!(matches!(err, DiarizationError::Poll { .. }));
    assert!(err.to_string().contains("connection reset"));
}

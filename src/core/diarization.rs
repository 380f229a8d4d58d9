//! Diarization job client: submit, then poll until the job is terminal.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::error::DiarizationError;
use crate::adapters::{DiarizationApi, FetchableRef};
use crate::domain::{DiarizationSegment, JobState, JobStatus, JobStatusResponse};

/// How the client waits for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Sleep between status requests
    pub interval: Duration,

    /// Give up after this long; `None` waits until the job is terminal
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Interpret a status response, rejecting success without segments
pub fn interpret(response: JobStatusResponse) -> Result<JobStatus, DiarizationError> {
    match response.state {
        JobState::Pending => Ok(JobStatus::Pending),
        JobState::Failed => Ok(JobStatus::Failed(response.raw.to_string())),
        JobState::Canceled => Ok(JobStatus::Canceled(response.raw.to_string())),
        JobState::Succeeded => {
            let segments = response.output.and_then(|o| o.diarization);
            match segments {
                Some(segments) if !segments.is_empty() => Ok(JobStatus::Succeeded(segments)),
                _ => Err(DiarizationError::MalformedResult {
                    payload: response.raw.to_string(),
                }),
            }
        }
    }
}

/// Client for one diarization backend, shared across requests
#[derive(Clone)]
pub struct DiarizationJobClient {
    api: Arc<dyn DiarizationApi>,
    policy: PollPolicy,
}

impl DiarizationJobClient {
    pub fn new(api: Arc<dyn DiarizationApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn backend(&self) -> &str {
        self.api.name()
    }

    /// Submit a job for the stored audio
    pub async fn submit(&self, audio: &FetchableRef) -> Result<String, DiarizationError> {
        let job_id = self
            .api
            .submit(audio)
            .await
            .map_err(DiarizationError::Submit)?;
        info!(%job_id, audio = %audio, backend = self.api.name(), "Submitted diarization job");
        Ok(job_id)
    }

    /// Fetch and interpret the current job status once
    pub async fn poll(&self, job_id: &str) -> Result<JobStatus, DiarizationError> {
        let response = self
            .api
            .job_status(job_id)
            .await
            .map_err(|error| DiarizationError::Poll {
                job_id: job_id.to_string(),
                error,
            })?;
        interpret(response)
    }

    /// Poll until the job is terminal, sleeping between attempts
    #[instrument(skip(self))]
    pub async fn wait_for_segments(
        &self,
        job_id: &str,
    ) -> Result<Vec<DiarizationSegment>, DiarizationError> {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.poll(job_id).await? {
                JobStatus::Succeeded(segments) => {
                    info!(
                        attempt,
                        segments = segments.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Diarization job succeeded"
                    );
                    return Ok(segments);
                }
                JobStatus::Failed(payload) => {
                    warn!(attempt, %payload, "Diarization job failed");
                    return Err(DiarizationError::Failed { payload });
                }
                JobStatus::Canceled(payload) => {
                    warn!(attempt, %payload, "Diarization job canceled");
                    return Err(DiarizationError::Canceled { payload });
                }
                JobStatus::Pending => {
                    debug!(attempt, "Diarization job pending");
                }
            }

            if let Some(max_wait) = self.policy.max_wait {
                let waited = started.elapsed();
                if waited + self.policy.interval > max_wait {
                    return Err(DiarizationError::TimedOut {
                        job_id: job_id.to_string(),
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.policy.interval).await;
        }
    }

    /// Submit a job and wait for its segments
    pub async fn diarize(
        &self,
        audio: &FetchableRef,
    ) -> Result<Vec<DiarizationSegment>, DiarizationError> {
        let job_id = self.submit(audio).await?;
        self.wait_for_segments(&job_id).await
    }
}

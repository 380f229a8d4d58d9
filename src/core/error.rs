//! Error taxonomy for the analysis pipeline.
//!
//! Adapters report failures as `anyhow::Error`; the orchestrator tags each
//! one with the step it came from. Only the orchestrator boundary turns these
//! into the uniform `{error}` report.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{ErrorKind, InvalidTransition};

/// Failure of the diarization job client
#[derive(Debug, Error)]
pub enum DiarizationError {
    #[error("Failed to submit diarization job: {0:#}")]
    Submit(anyhow::Error),

    #[error("Failed to poll diarization job {job_id}: {error:#}")]
    Poll { job_id: String, error: anyhow::Error },

    #[error("Diarization job failed: {payload}")]
    Failed { payload: String },

    #[error("Diarization job canceled: {payload}")]
    Canceled { payload: String },

    #[error("Diarization output missing 'diarization' segments: {payload}")]
    MalformedResult { payload: String },

    #[error("Diarization job {job_id} still pending after {waited:?}")]
    TimedOut { job_id: String, waited: Duration },
}

/// Any failure that aborts an analysis request
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Input(String),

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    #[error(transparent)]
    Diarization(DiarizationError),

    #[error("Extraction error: {0:#}")]
    Extraction(anyhow::Error),

    #[error("Transcription error: {0:#}")]
    Transcription(anyhow::Error),

    #[error("Sentiment error: {0:#}")]
    Sentiment(anyhow::Error),

    #[error("Timeout: diarization job {job_id} did not finish within {waited:?}")]
    Timeout { job_id: String, waited: Duration },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Diarization(_) => ErrorKind::Diarization,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Transcription(_) => ErrorKind::Transcription,
            Self::Sentiment(_) => ErrorKind::Sentiment,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<DiarizationError> for AnalysisError {
    fn from(error: DiarizationError) -> Self {
        match error {
            DiarizationError::TimedOut { job_id, waited } => Self::Timeout { job_id, waited },
            other => Self::Diarization(other),
        }
    }
}

impl From<InvalidTransition> for AnalysisError {
    fn from(error: InvalidTransition) -> Self {
        Self::Internal(error.to_string())
    }
}

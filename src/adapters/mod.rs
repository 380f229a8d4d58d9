//! Adapter interfaces for external systems.
//!
//! The pipeline only depends on these traits. Concrete adapters are built
//! once per process and shared by reference across requests; none of them
//! keeps per-request state.

pub mod azure;
pub mod pyannote;
pub mod sentiment;
pub mod whisper;

use std::fmt;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{JobStatusResponse, RawSentiment};

pub use azure::{AzureBlobStore, AzureConfig};
pub use pyannote::PyannoteClient;
pub use sentiment::CommandSentimentClassifier;
pub use whisper::WhisperTranscriber;

/// Time-limited URL granting read access to stored audio.
///
/// Formatting never prints the query string, which carries the credential.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchableRef {
    url: String,

    /// When the reference stops working, if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl FetchableRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The full URL, including any credential in the query string
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The URL without its query string
    pub fn redacted(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

impl fmt::Debug for FetchableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchableRef")
            .field("url", &self.redacted())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Display for FetchableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.redacted())
    }
}

/// Output of a transcription adapter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub text: String,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Persists uploaded audio and hands out fetchable references
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Store `bytes` under `name` and return a time-limited reference
    async fn store(&self, bytes: &[u8], name: &str) -> Result<FetchableRef>;
}

/// Remote diarization job API
#[async_trait]
pub trait DiarizationApi: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Submit a diarization job for the audio behind `audio`, returning the job id
    async fn submit(&self, audio: &FetchableRef) -> Result<String>;

    /// Fetch the current status of a job
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse>;
}

/// Speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Transcribe the WAV clip at `clip`
    async fn transcribe(&self, clip: &Path) -> Result<Transcript>;
}

/// Text sentiment classification
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Classify `text`, returning the model's raw label and confidence
    async fn predict(&self, text: &str) -> Result<RawSentiment>;
}

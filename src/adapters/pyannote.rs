//! pyannoteAI diarization API client.
//!
//! Endpoints:
//! - POST {endpoint}/diarize   `{"url": ...}` -> `{"jobId": ...}`
//! - GET  {endpoint}/jobs/{id} -> `{"status": ..., "output": {"diarization": [...]}}`
//!
//! Auth: Bearer token

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DiarizationApi, FetchableRef};
use crate::domain::JobStatusResponse;

/// Default public API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.pyannote.ai/v1";

/// pyannoteAI client
pub struct PyannoteClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct DiarizeRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiarizeResponse {
    job_id: String,
}

impl PyannoteClient {
    /// Create a new client
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create with the API key from `PYANNOTE_API_KEY`
    pub fn from_env(endpoint: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("PYANNOTE_API_KEY")
            .context("PYANNOTE_API_KEY environment variable required")?;
        Ok(Self::new(endpoint, api_key))
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path)
    }
}

#[async_trait]
impl DiarizationApi for PyannoteClient {
    fn name(&self) -> &str {
        "pyannote"
    }

    async fn submit(&self, audio: &FetchableRef) -> Result<String> {
        let response = self
            .client
            .post(self.api_url("diarize"))
            .bearer_auth(&self.api_key)
            .json(&DiarizeRequest { url: audio.url() })
            .send()
            .await
            .context("Failed to submit diarization job")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Diarization submit failed ({}): {}", status, text.trim());
        }

        let body: DiarizeResponse = response
            .json()
            .await
            .context("Failed to parse diarization submit response")?;

        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        let response = self
            .client
            .get(self.api_url(&format!("jobs/{}", job_id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to poll diarization job {}", job_id))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Diarization job poll failed ({}): {}", status, text.trim());
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse diarization job response")?;

        JobStatusResponse::from_json(raw).context("Unexpected diarization job response")
    }
}

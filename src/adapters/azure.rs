//! Azure Blob Storage adapter.
//!
//! Uploads audio with a container-level SAS token and hands out the blob URL
//! carrying that same token as the fetchable reference. The reference stops
//! working when the SAS expires (`se=` parameter), typically after one hour.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AudioStore, FetchableRef};

/// Connection settings for an Azure Blob container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Storage account name
    pub account: String,

    /// Container receiving the uploads
    pub container: String,

    /// Container SAS token with create/write/read permissions
    #[serde(skip_serializing)]
    pub sas_token: String,

    /// Override for the blob endpoint (e.g. an Azurite emulator)
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Azure Blob Storage client
pub struct AzureBlobStore {
    config: AzureConfig,
    client: reqwest::Client,
}

impl AzureBlobStore {
    /// Create a new client
    pub fn new(config: AzureConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create from account/container settings, reading the SAS token from
    /// `AZURE_STORAGE_SAS_TOKEN`
    pub fn from_env(account: String, container: String, endpoint: Option<String>) -> Result<Self> {
        let sas_token = std::env::var("AZURE_STORAGE_SAS_TOKEN")
            .context("AZURE_STORAGE_SAS_TOKEN environment variable required")?;
        Ok(Self::new(AzureConfig {
            account,
            container,
            sas_token,
            endpoint,
        }))
    }

    fn endpoint(&self) -> String {
        self.config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", self.config.account))
    }

    /// Build the SAS-signed URL of a blob
    fn blob_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint())
            .with_context(|| format!("Invalid blob endpoint: {}", self.endpoint()))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("Blob endpoint cannot be a base URL: {}", self.endpoint()))?
            .pop_if_empty()
            .push(&self.config.container)
            .push(name);

        let sas = self.config.sas_token.trim_start_matches('?');
        if !sas.is_empty() {
            url.set_query(Some(sas));
        }

        Ok(url)
    }
}

/// Expiry encoded in a SAS URL's `se` parameter, if it is a full RFC 3339 timestamp
fn sas_expiry(url: &Url) -> Option<DateTime<Utc>> {
    url.query_pairs()
        .find(|(key, _)| key == "se")
        .and_then(|(_, value)| DateTime::parse_from_rfc3339(&value).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Content type for an uploaded file, from its extension
fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AudioStore for AzureBlobStore {
    fn name(&self) -> &str {
        "azure-blob"
    }

    async fn store(&self, bytes: &[u8], name: &str) -> Result<FetchableRef> {
        let url = self.blob_url(name)?;

        let response = self
            .client
            .put(url.clone())
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", content_type_for(name))
            .body(bytes.to_vec())
            .send()
            .await
            .with_context(|| format!("Failed to upload blob '{}'", name))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Blob upload failed ({}): {}", status, text.trim());
        }

        let mut reference = FetchableRef::new(url.as_str());
        if let Some(expires_at) = sas_expiry(&url) {
            reference = reference.with_expiry(expires_at);
        }

        debug!(blob = %reference, size = bytes.len(), "Uploaded audio blob");
        Ok(reference)
    }
}

//! Configuration for call-feedback.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CALL_FEEDBACK_WORK_DIR, WHISPER_PATH)
//! 2. Config file (.call-feedback/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .call-feedback/config.yaml
//! - Falls back to <config dir>/call-feedback/config.yaml
//! - Relative paths in the file are resolved against the project root
//!
//! Credentials never live in the file: the diarization API key and the
//! storage SAS token are read from the environment by their adapters.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::pyannote::DEFAULT_ENDPOINT;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const ENV_WORK_DIR: &str = "CALL_FEEDBACK_WORK_DIR";
pub const ENV_WHISPER_PATH: &str = "WHISPER_PATH";
pub const ENV_PYANNOTE_API_KEY: &str = "PYANNOTE_API_KEY";
pub const ENV_AZURE_SAS_TOKEN: &str = "AZURE_STORAGE_SAS_TOKEN";

const CONFIG_DIR_NAME: &str = ".call-feedback";
const DEFAULT_CONTAINER: &str = "audio-files";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub diarization: DiarizationConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Root for per-request workspaces
    pub work_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    pub account: Option<String>,
    pub container: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiarizationConfig {
    pub endpoint: Option<String>,
    pub poll_interval_seconds: Option<u64>,
    pub max_wait_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptionConfig {
    pub whisper_path: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioConfig {
    pub ffmpeg_path: Option<String>,
    pub max_upload_bytes: Option<u64>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Root for per-request workspaces
    pub work_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub storage: StorageSettings,
    pub diarization: DiarizationSettings,
    pub transcription: TranscriptionSettings,
    pub sentiment: SentimentSettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageSettings {
    /// Storage account; required to store uploads
    pub account: Option<String>,
    pub container: String,
    /// Override for the blob endpoint (e.g. an emulator)
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiarizationSettings {
    pub endpoint: String,
    pub poll_interval: Duration,
    pub max_wait: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionSettings {
    pub whisper_path: PathBuf,
    pub model: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSettings {
    /// Classifier command; required to score transcripts
    pub command: Option<String>,
    pub args: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    pub ffmpeg_path: PathBuf,
    pub max_upload_bytes: u64,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve(ConfigFile::default(), None, None, |_| None)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR_NAME).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("call-feedback").join("config.yaml");
    user_config.exists().then_some(user_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Directory that relative paths in `config_path` are resolved against
fn base_dir_for(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    // .call-feedback/config.yaml resolves against the project root
    if parent.file_name().is_some_and(|n| n == CONFIG_DIR_NAME) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Apply environment overrides and defaults to a parsed file
fn resolve<F>(file: ConfigFile, config_file: Option<PathBuf>, base_dir: Option<&Path>, env: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let base = base_dir.unwrap_or(Path::new("."));

    let work_dir = if let Some(dir) = env(ENV_WORK_DIR) {
        PathBuf::from(dir)
    } else if let Some(ref dir) = file.paths.work_dir {
        resolve_path(base, dir)
    } else {
        std::env::temp_dir().join("call-feedback")
    };

    let storage = StorageSettings {
        account: file.storage.account,
        container: file
            .storage
            .container
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
        endpoint: file.storage.endpoint,
    };

    let diarization = DiarizationSettings {
        endpoint: file
            .diarization
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        poll_interval: Duration::from_secs(file.diarization.poll_interval_seconds.unwrap_or(5)),
        max_wait: file.diarization.max_wait_seconds.map(Duration::from_secs),
    };

    let whisper_path = if let Some(path) = env(ENV_WHISPER_PATH) {
        PathBuf::from(path)
    } else if let Some(ref path) = file.transcription.whisper_path {
        if path.contains('/') {
            resolve_path(base, path)
        } else {
            // bare program name, looked up on PATH
            PathBuf::from(path)
        }
    } else {
        PathBuf::from("whisper")
    };

    let transcription = TranscriptionSettings {
        whisper_path,
        model: file
            .transcription
            .model
            .unwrap_or_else(|| "small".to_string()),
        language: file.transcription.language,
    };

    let sentiment = SentimentSettings {
        command: file.sentiment.command,
        args: file.sentiment.args,
        timeout: Duration::from_secs(file.sentiment.timeout_seconds.unwrap_or(60)),
    };

    let audio = AudioSettings {
        ffmpeg_path: PathBuf::from(file.audio.ffmpeg_path.unwrap_or_else(|| "ffmpeg".to_string())),
        max_upload_bytes: file.audio.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
    };

    ResolvedConfig {
        work_dir,
        config_file,
        storage,
        diarization,
        transcription,
        sentiment,
        audio,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

    match find_config_file() {
        Some(config_path) => {
            let file = load_config_file(&config_path)?;
            let base_dir = base_dir_for(&config_path);
            Ok(resolve(file, Some(config_path), Some(&base_dir), env))
        }
        None => Ok(resolve(ConfigFile::default(), None, None, env)),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Whether a secret is present in the environment, for display
pub fn secret_status(key: &str) -> &'static str {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => "set",
        _ => "(not set)",
    }
}

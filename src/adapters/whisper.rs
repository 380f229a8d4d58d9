//! Whisper transcription backend.
//!
//! Shells out to a local whisper binary for each clip.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::{Transcriber, Transcript};

/// Whisper output JSON structure
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
}

/// Transcriber backed by the `whisper` CLI
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    /// Path to the whisper binary
    binary_path: PathBuf,

    /// Model name (tiny, base, small, ...)
    model: String,

    /// Spoken language; auto-detected when unset
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(binary_path: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model: model.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn command_args(&self, clip: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            clip.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--output_format".to_string(),
            "json".to_string(),
        ];
        if let Some(ref language) = self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        args
    }
}

/// Parse whisper's JSON output, trimming the text
fn parse_output(json: &str) -> Result<Transcript> {
    let whisper: WhisperOutput =
        serde_json::from_str(json).context("Failed to parse whisper JSON")?;
    Ok(Transcript::new(whisper.text.trim()))
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, clip: &Path) -> Result<Transcript> {
        // Whisper writes <stem>.json into the output dir
        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;

        let output = Command::new(&self.binary_path)
            .args(self.command_args(clip, temp_dir.path()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run whisper ({})", self.binary_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Whisper failed: {}", stderr.trim());
        }

        let stem = clip.file_stem().unwrap_or_default().to_string_lossy();
        let json_path = temp_dir.path().join(format!("{}.json", stem));

        let json_content = tokio::fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("Failed to read whisper output: {}", json_path.display()))?;

        parse_output(&json_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        let whisper = WhisperTranscriber::new("/usr/bin/whisper", "small").with_language("en");
        let args = whisper.command_args(Path::new("/tmp/clip.wav"), Path::new("/tmp/out"));
        assert_eq!(
            args,
            vec![
                "/tmp/clip.wav",
                "--model",
                "small",
                "--output_dir",
                "/tmp/out",
                "--output_format",
                "json",
                "--language",
                "en"
            ]
        );
    }

    #[test]
    fn test_language_is_optional() {
        let whisper = WhisperTranscriber::new("whisper", "base");
        let args = whisper.command_args(Path::new("c.wav"), Path::new("o"));
        assert!(!args.contains(&"--language".to_string()));
    }

    #[test]
    fn test_parse_output_trims_text() {
        let transcript =
            parse_output(r#"{"text":"  hello there ","segments":[],"language":"en"}"#).unwrap();
        assert_eq!(transcript.text, "hello there");
    }

    #[test]
    fn test_parse_output_rejects_garbage() {
        assert!(parse_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let whisper = WhisperTranscriber::new("/nonexistent/whisper-binary", "tiny");
        let result = whisper.transcribe(Path::new("/tmp/clip.wav")).await;
        assert!(result.is_err());
    }
}

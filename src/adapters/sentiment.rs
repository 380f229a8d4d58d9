//! Sentiment classification through an external command.
//!
//! The command receives the text on stdin and prints one JSON object on
//! stdout: `{"label": "POSITIVE", "score": 0.93}` (`confidence` is accepted
//! in place of `score`). This keeps the model process outside ours, the same
//! way the transcriber shells out to whisper.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::SentimentClassifier;
use crate::domain::RawSentiment;

/// Sentiment classifier using a subprocess per prediction
#[derive(Debug, Clone)]
pub struct CommandSentimentClassifier {
    /// Program to run
    program: String,

    /// Arguments passed to the program
    args: Vec<String>,

    /// Per-prediction timeout
    timeout: Duration,
}

impl CommandSentimentClassifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, text: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn sentiment command '{}'", self.program))?;

        // the stdin write shares the timeout: a command that never reads
        // blocks it once the pipe is full
        let exchange = async {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(text.as_bytes())
                    .await
                    .context("Failed to write to sentiment command stdin")?;
                // Drop stdin to signal EOF
            }
            child
                .wait_with_output()
                .await
                .context("Failed to wait for sentiment command")
        };

        let output = timeout(self.timeout, exchange).await.with_context(|| {
            format!(
                "Sentiment command '{}' timed out after {:?}",
                self.program, self.timeout
            )
        })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Sentiment command '{}' failed with exit code {}: {}",
                self.program,
                exit_code,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).context("Sentiment command output is not valid UTF-8")
    }
}

/// Parse the last non-empty stdout line as the prediction
fn parse_prediction(stdout: &str) -> Result<RawSentiment> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .context("Sentiment command produced no output")?;

    serde_json::from_str(line.trim())
        .with_context(|| format!("Failed to parse sentiment prediction: {}", line.trim()))
}

#[async_trait]
impl SentimentClassifier for CommandSentimentClassifier {
    fn name(&self) -> &str {
        "command"
    }

    async fn predict(&self, text: &str) -> Result<RawSentiment> {
        let stdout = self.run(text).await?;
        parse_prediction(&stdout)
    }
}

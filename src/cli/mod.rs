//! Command-line interface for call-feedback.
//!
//! Provides commands for analyzing a recording and inspecting the resolved
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ENV_AZURE_SAS_TOKEN, ENV_PYANNOTE_API_KEY};
use crate::core::Orchestrator;
use crate::domain::{AnalysisReport, AudioUpload, ErrorKind};

/// call-feedback - speaker-diarized call transcription and sentiment
#[derive(Parser, Debug)]
#[command(name = "call-feedback")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a call recording and print the JSON report
    Analyze {
        /// Audio file (WAV, or anything ffmpeg can read)
        file: PathBuf,

        /// File name to report to storage (defaults to the file's name)
        #[arg(short, long)]
        name: Option<String>,

        /// Give up on diarization after this many seconds
        #[arg(long, env = "CALL_FEEDBACK_MAX_WAIT")]
        max_wait: Option<u64>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze {
                file,
                name,
                max_wait,
                pretty,
            } => analyze_file(file, name, max_wait, pretty).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Process exit code for a report
pub fn exit_code(report: &AnalysisReport) -> i32 {
    match report.error_kind() {
        None => 0,
        Some(ErrorKind::Input) => 2,
        Some(_) => 1,
    }
}

/// Analyze one file. A missing file is an input error and is reported
/// before any adapter is configured.
async fn analyze_file(
    file: PathBuf,
    name: Option<String>,
    max_wait: Option<u64>,
    pretty: bool,
) -> Result<()> {
    let report = match read_upload(&file, name).await? {
        Some(upload) => {
            let mut cfg = config::config()?.clone();
            if let Some(secs) = max_wait {
                cfg.diarization.max_wait = Some(Duration::from_secs(secs));
            }
            let orchestrator = Orchestrator::from_config(&cfg)?;
            orchestrator.analyze(Some(upload)).await
        }
        None => missing_file_report(&file),
    };

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if report.is_success() {
        println!("{}", json);
    } else {
        eprintln!("{}", json);
        std::process::exit(exit_code(&report));
    }

    Ok(())
}

/// Read the audio file; `None` when it does not exist
async fn read_upload(file: &Path, name: Option<String>) -> Result<Option<AudioUpload>> {
    match tokio::fs::read(file).await {
        Ok(bytes) => {
            let filename = name.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "audio.wav".to_string())
            });
            Ok(Some(AudioUpload::new(bytes, filename)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read audio file: {}", file.display())),
    }
}

fn missing_file_report(file: &Path) -> AnalysisReport {
    AnalysisReport::Failure {
        error: format!("Audio file not found: {}", file.display()),
        kind: ErrorKind::Input,
    }
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("call-feedback configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Work dir:        {}", cfg.work_dir.display());
    println!();
    println!("Storage:");
    println!(
        "  Account:         {}",
        cfg.storage.account.as_deref().unwrap_or("(not set)")
    );
    println!("  Container:       {}", cfg.storage.container);
    if let Some(ref endpoint) = cfg.storage.endpoint {
        println!("  Endpoint:        {}", endpoint);
    }
    println!("  SAS token:       {}", config::secret_status(ENV_AZURE_SAS_TOKEN));
    println!();
    println!("Diarization:");
    println!("  Endpoint:        {}", cfg.diarization.endpoint);
    println!("  Poll interval:   {}s", cfg.diarization.poll_interval.as_secs());
    match cfg.diarization.max_wait {
        Some(max_wait) => println!("  Max wait:        {}s", max_wait.as_secs()),
        None => println!("  Max wait:        (unbounded)"),
    }
    println!("  API key:         {}", config::secret_status(ENV_PYANNOTE_API_KEY));
    println!();
    println!("Transcription:");
    println!("  Whisper:         {}", cfg.transcription.whisper_path.display());
    println!("  Model:           {}", cfg.transcription.model);
    println!(
        "  Language:        {}",
        cfg.transcription.language.as_deref().unwrap_or("(auto)")
    );
    println!();
    println!("Sentiment:");
    match cfg.sentiment.command {
        Some(ref command) => println!(
            "  Command:         {} {}",
            command,
            cfg.sentiment.args.join(" ")
        ),
        None => println!("  Command:         (not set)"),
    }
    println!("  Timeout:         {}s", cfg.sentiment.timeout.as_secs());
    println!();
    println!("Audio:");
    println!("  ffmpeg:          {}", cfg.audio.ffmpeg_path.display());
    println!("  Max upload:      {} bytes", cfg.audio.max_upload_bytes);

    Ok(())
}

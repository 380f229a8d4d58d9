//! call-feedback - speaker-diarized call transcription and sentiment
//!
//! Takes one call recording, asks a diarization service who spoke when,
//! transcribes every speaker turn, scores its sentiment, and reports a
//! per-speaker transcript with a confidence-weighted sentiment distribution.
//!
//! # Architecture
//!
//! Each request runs as a sequential state machine:
//! - Store the upload and get a time-limited fetchable reference
//! - Submit a diarization job and poll until it is terminal
//! - For each segment: extract the clip, transcribe, score
//! - Aggregate per speaker
//!
//! Any step failure aborts the request with a single error report. Transient
//! files live in a per-request workspace and are removed on every exit path.
//!
//! # Modules
//!
//! - `adapters`: External systems (Azure Blob, pyannote, whisper, sentiment command)
//! - `core`: Pipeline logic (diarization client, extractor, aggregator, orchestrator)
//! - `domain`: Data structures (segments, sentiment, speaker records, run state)
//! - `config`: YAML config file and environment overrides
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Analyze a recording
//! call-feedback analyze call.wav --pretty
//!
//! # Show resolved configuration
//! call-feedback config
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::{AnalysisError, Orchestrator, OrchestratorSettings, RunOutcome};
pub use domain::{AnalysisReport, AudioUpload, ErrorKind, SpeakerRecord, SpeakerSummaries};

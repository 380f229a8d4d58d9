//! Core analysis pipeline.
//!
//! This module contains:
//! - Diarization: job submission and polling
//! - Extractor: cutting speaker turns out of the source audio
//! - Aggregator: per-speaker transcript and sentiment distribution
//! - Workspace: request-scoped transient files
//! - Orchestrator: the per-request state machine

pub mod aggregator;
pub mod diarization;
pub mod error;
pub mod extractor;
pub mod orchestrator;
pub mod workspace;

// Re-export commonly used types
pub use aggregator::{aggregate, SpeakerAggregator};
pub use diarization::{interpret, DiarizationJobClient, PollPolicy};
pub use error::{AnalysisError, DiarizationError};
pub use extractor::{convert_to_wav, is_wav, AudioClip, Samples, SegmentExtractor, SourceAudio};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RunOutcome};
pub use workspace::{sanitize_component, RequestWorkspace};

//! Domain types for call analysis.
//!
//! This module contains the core data structures:
//! - Segment: diarization speaker turns and job status payloads
//! - Sentiment: labels and the confidence-threshold policy
//! - Speaker: per-segment results and per-speaker records
//! - Run: per-request pipeline state machine
//! - Report: inbound upload and outbound report

pub mod report;
pub mod run;
pub mod segment;
pub mod sentiment;
pub mod speaker;

// Re-export commonly used types
pub use report::{AnalysisReport, AudioUpload, ErrorKind};
pub use run::{InvalidTransition, PipelineState, Run, Transition};
pub use segment::{DiarizationSegment, JobOutput, JobState, JobStatus, JobStatusResponse};
pub use sentiment::{
    round2, RawSentiment, SentimentLabel, SentimentPolicyError, SentimentResult,
    SENTIMENT_THRESHOLD,
};
pub use speaker::{SegmentResult, SpeakerRecord, SpeakerSummaries};

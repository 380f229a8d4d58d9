//! Per-request pipeline state.
//!
//! A Run tracks one analysis request through the pipeline state machine.
//! It lives only as long as the request and is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::report::ErrorKind;

/// State of the analysis pipeline for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PipelineState {
    /// Upload accepted, nothing done yet
    Received,

    /// Audio persisted and a fetchable reference issued
    Stored,

    /// Waiting on the diarization job
    Diarizing,

    /// Cutting the clip for the current segment
    Extracting,

    /// Transcribing the current clip
    Transcribing,

    /// Scoring the current transcript
    Scoring,

    /// Building per-speaker summaries
    Aggregating,

    /// Finished successfully
    Done,

    /// Aborted by a step failure
    Errored { kind: ErrorKind, message: String },
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Stored => "stored",
            Self::Diarizing => "diarizing",
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::Scoring => "scoring",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Errored { .. } => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored { .. })
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;

        if self.is_terminal() {
            return false;
        }
        if matches!(next, Errored { .. }) {
            return true;
        }

        matches!(
            (self, next),
            (Received, Stored)
                | (Stored, Diarizing)
                | (Diarizing, Extracting)
                | (Extracting, Transcribing)
                | (Transcribing, Scoring)
                // empty transcript: the segment is dropped
                | (Transcribing, Extracting)
                | (Transcribing, Aggregating)
                | (Scoring, Extracting)
                | (Scoring, Aggregating)
                | (Aggregating, Done)
        )
    }
}

/// A recorded state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

/// Attempted transition the state machine does not allow
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid pipeline transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// One analysis request moving through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Request-scoped identifier, also used to name transient artifacts
    pub id: Uuid,

    /// Current state
    pub state: PipelineState,

    /// When the request was received
    pub started_at: DateTime<Utc>,

    /// When the request reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Every state change, in order
    pub transitions: Vec<Transition>,

    /// Number of diarization segments processed so far
    pub segments_processed: usize,

    /// Number of segments dropped for empty text
    pub segments_dropped: usize,
}

impl Run {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            state: PipelineState::Received,
            started_at: Utc::now(),
            completed_at: None,
            transitions: Vec::new(),
            segments_processed: 0,
            segments_dropped: 0,
        }
    }

    /// Move to `next`, recording the transition
    pub fn advance(&mut self, next: PipelineState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(&next) {
            return Err(InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }

        let now = Utc::now();
        if next.is_terminal() {
            self.completed_at = Some(now);
        }

        let from = std::mem::replace(&mut self.state, next.clone());
        self.transitions.push(Transition { from, to: next, at: now });
        Ok(())
    }

    /// Move to ERRORED. Reaching a terminal state twice is ignored.
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        let next = PipelineState::Errored {
            kind,
            message: message.into(),
        };
        // every non-terminal state may move to ERRORED
        let _ = self.advance(next);
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Names of the visited states, starting with the initial one
    pub fn state_path(&self) -> Vec<&'static str> {
        let mut path = vec![PipelineState::Received.name()];
        path.extend(self.transitions.iter().map(|t| t.to.name()));
        path
    }
}

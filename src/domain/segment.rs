//! Diarization segments and job status payloads.

use serde::{Deserialize, Serialize};

/// One speaker turn reported by the diarization job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationSegment {
    /// Speaker label assigned by the diarizer (e.g. "SPEAKER_00")
    pub speaker: String,

    /// Start offset in seconds
    pub start: f64,

    /// End offset in seconds (exclusive)
    pub end: f64,
}

impl DiarizationSegment {
    pub fn new(speaker: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            speaker: speaker.into(),
            start,
            end,
        }
    }

    /// Start offset in whole milliseconds (truncated, never rounded)
    pub fn start_ms(&self) -> u64 {
        seconds_to_ms(self.start)
    }

    /// End offset in whole milliseconds (truncated, never rounded)
    pub fn end_ms(&self) -> u64 {
        seconds_to_ms(self.end)
    }
}

// Float-to-int casts saturate, so negative offsets clamp to zero.
fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0) as u64
}

/// Job state as reported by the diarization API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Succeeded,
    Failed,
    #[serde(alias = "cancelled")]
    Canceled,

    /// Any non-terminal state ("pending", "created", "running", ...)
    #[serde(other)]
    Pending,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// `output` object of a job status response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobOutput {
    #[serde(default)]
    pub diarization: Option<Vec<DiarizationSegment>>,
}

/// A job status response, typed where the pipeline needs it and raw otherwise
#[derive(Debug, Clone)]
pub struct JobStatusResponse {
    pub state: JobState,
    pub output: Option<JobOutput>,

    /// The full payload, kept for diagnostics on failure
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct JobStatusBody {
    status: JobState,
    #[serde(default)]
    output: Option<JobOutput>,
}

impl JobStatusResponse {
    /// Parse a job status JSON document
    pub fn from_json(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        let body: JobStatusBody = serde_json::from_value(raw.clone())?;
        Ok(Self {
            state: body.status,
            output: body.output,
            raw,
        })
    }

    /// Convenience constructor for a pending job
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            output: None,
            raw: serde_json::json!({ "status": "pending" }),
        }
    }

    /// Convenience constructor for a succeeded job
    pub fn succeeded(segments: Vec<DiarizationSegment>) -> Self {
        let raw = serde_json::json!({
            "status": "succeeded",
            "output": { "diarization": segments },
        });
        Self {
            state: JobState::Succeeded,
            output: Some(JobOutput {
                diarization: Some(segments),
            }),
            raw,
        }
    }
}

/// Interpreted job status
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Succeeded(Vec<DiarizationSegment>),
    Failed(String),
    Canceled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_conversion_truncates() {
        let segment = DiarizationSegment::new("A", 1.2349, 2.9999);
        assert_eq!(segment.start_ms(), 1234);
        assert_eq!(segment.end_ms(), 2999);
    }

    #[test]
    fn test_negative_offset_clamps_to_zero() {
        let segment = DiarizationSegment::new("A", -0.5, 1.0);
        assert_eq!(segment.start_ms(), 0);
    }

    #[test]
    fn test_parse_succeeded_response() {
        let raw = serde_json::json!({
            "jobId": "abc",
            "status": "succeeded",
            "output": {
                "diarization": [
                    { "speaker": "SPEAKER_00", "start": 0.5, "end": 2.25 },
                    { "speaker": "SPEAKER_01", "start": 2.25, "end": 4.0 }
                ]
            }
        });

        let response = JobStatusResponse::from_json(raw).unwrap();
        assert_eq!(response.state, JobState::Succeeded);
        let segments = response.output.unwrap().diarization.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].speaker, "SPEAKER_01");
    }

    #[test]
    fn test_unknown_status_is_pending() {
        for status in ["pending", "created", "running"] {
            let raw = serde_json::json!({ "status": status });
            let response = JobStatusResponse::from_json(raw).unwrap();
            assert_eq!(response.state, JobState::Pending);
            assert!(!response.state.is_terminal());
        }
    }

    #[test]
    fn test_cancelled_spelling_alias() {
        let raw = serde_json::json!({ "status": "cancelled" });
        let response = JobStatusResponse::from_json(raw).unwrap();
        assert_eq!(response.state, JobState::Canceled);
    }

    #[test]
    fn test_missing_status_is_an_error() {
        let raw = serde_json::json!({ "message": "rate limited" });
        assert!(JobStatusResponse::from_json(raw).is_err());
    }
}

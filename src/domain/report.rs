//! Inbound upload and outbound report shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::speaker::SpeakerSummaries;

/// Audio payload submitted for analysis
#[derive(Clone)]
pub struct AudioUpload {
    /// Raw file contents
    pub bytes: Vec<u8>,

    /// Client-supplied file name (e.g. "call.wav")
    pub filename: String,
}

impl AudioUpload {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Category of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Storage,
    Diarization,
    Extraction,
    Transcription,
    Sentiment,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status for a report carrying this kind of error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Input => 400,
            _ => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "InputError",
            Self::Storage => "StorageError",
            Self::Diarization => "DiarizationError",
            Self::Extraction => "ExtractionError",
            Self::Transcription => "TranscriptionError",
            Self::Sentiment => "SentimentError",
            Self::Timeout => "TimeoutError",
            Self::Internal => "InternalError",
        };
        f.write_str(name)
    }
}

/// Outcome of one analysis request, as returned to the caller.
///
/// Serializes to either `{"speakers": {...}}` or `{"error": "..."}`.
/// A failure never carries partial results.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Success {
        speakers: SpeakerSummaries,
    },
    Failure {
        error: String,
        #[serde(skip)]
        kind: ErrorKind,
    },
}

impl AnalysisReport {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success { .. } => 200,
            Self::Failure { kind, .. } => kind.status_code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn speakers(&self) -> Option<&SpeakerSummaries> {
        match self {
            Self::Success { speakers } => Some(speakers),
            Self::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_error_only() {
        let report = AnalysisReport::Failure {
            error: "No audio uploaded".to_string(),
            kind: ErrorKind::Input,
        };

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({ "error": "No audio uploaded" })
        );
        assert_eq!(report.status_code(), 400);
    }

    #[test]
    fn test_success_serializes_speakers() {
        let report = AnalysisReport::Success {
            speakers: SpeakerSummaries::new(),
        };

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({ "speakers": {} })
        );
        assert_eq!(report.status_code(), 200);
    }

    #[test]
    fn test_server_errors_map_to_500() {
        for kind in [
            ErrorKind::Storage,
            ErrorKind::Diarization,
            ErrorKind::Extraction,
            ErrorKind::Transcription,
            ErrorKind::Sentiment,
            ErrorKind::Timeout,
            ErrorKind::Internal,
        ] {
            assert_eq!(kind.status_code(), 500, "{}", kind);
        }
    }

    #[test]
    fn test_upload_debug_hides_bytes() {
        let upload = AudioUpload::new(vec![0u8; 2048], "call.wav");
        let debug = format!("{:?}", upload);
        assert!(debug.contains("2048"));
        assert!(debug.contains("call.wav"));
    }
}

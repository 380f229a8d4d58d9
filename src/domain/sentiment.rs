//! Sentiment labels and the confidence-threshold policy.
//!
//! Classifiers report a raw `(label, confidence)` pair. The pipeline never
//! uses the raw label directly: anything scored below the threshold is
//! reclassified as NEUTRAL, whatever the classifier said.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confidence below which a classified label is overridden to NEUTRAL
pub const SENTIMENT_THRESHOLD: f64 = 0.6;

/// Effective sentiment of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = SentimentPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Ok(Self::Positive),
            "NEGATIVE" => Ok(Self::Negative),
            "NEUTRAL" => Ok(Self::Neutral),
            _ => Err(SentimentPolicyError::UnknownLabel(s.to_string())),
        }
    }
}

/// Output of a sentiment classifier before the threshold policy is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSentiment {
    /// Label as reported by the model (e.g. "POSITIVE")
    pub label: String,

    /// Model confidence in [0, 1]
    #[serde(alias = "score")]
    pub confidence: f64,
}

impl RawSentiment {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Raw classifier output that cannot be turned into a [`SentimentResult`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SentimentPolicyError {
    #[error("Unknown sentiment label: {0}")]
    UnknownLabel(String),

    #[error("Sentiment confidence out of range [0, 1]: {0}")]
    ConfidenceOutOfRange(f64),
}

/// Sentiment after the threshold policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,

    /// Raw model confidence in [0, 1], kept even when the label was overridden
    pub confidence: f64,
}

impl SentimentResult {
    /// Apply the threshold policy to a raw classifier result.
    ///
    /// A confidence below `threshold` always yields NEUTRAL, even for labels
    /// outside the known taxonomy.
    pub fn classify(raw: &RawSentiment, threshold: f64) -> Result<Self, SentimentPolicyError> {
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(SentimentPolicyError::ConfidenceOutOfRange(raw.confidence));
        }

        let label = if raw.confidence < threshold {
            SentimentLabel::Neutral
        } else {
            raw.label.parse()?
        };

        Ok(Self {
            label,
            confidence: raw.confidence,
        })
    }

    /// Confidence expressed as a percentage with two-decimal rounding
    pub fn confidence_pct(&self) -> f64 {
        round2(self.confidence * 100.0)
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

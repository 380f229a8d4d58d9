//! Per-speaker analysis records.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::segment::DiarizationSegment;
use super::sentiment::{SentimentLabel, SentimentResult};

/// Analysis of a single transcribed segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentResult {
    /// Start offset in seconds, as reported by the diarizer
    pub start: f64,

    /// End offset in seconds, as reported by the diarizer
    pub end: f64,

    /// Transcribed text (trimmed, non-empty for anything aggregated)
    pub text: String,

    /// Effective sentiment after the threshold policy
    pub sentiment: SentimentLabel,

    /// Classifier confidence as a percentage (0-100, two decimals)
    pub confidence: f64,
}

impl SegmentResult {
    pub fn new(segment: &DiarizationSegment, text: impl Into<String>, sentiment: SentimentResult) -> Self {
        Self {
            start: segment.start,
            end: segment.end,
            text: text.into(),
            sentiment: sentiment.label,
            confidence: sentiment.confidence_pct(),
        }
    }
}

/// Everything known about one speaker after aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerRecord {
    /// Speaker label; serialized as the map key, not inside the record
    #[serde(skip)]
    pub speaker_id: String,

    /// Segment texts joined by a single space, in processing order
    pub transcript: String,

    /// Segments in processing order
    pub segments: Vec<SegmentResult>,

    #[serde(rename = "positive")]
    pub positive_pct: f64,

    #[serde(rename = "negative")]
    pub negative_pct: f64,

    #[serde(rename = "neutral")]
    pub neutral_pct: f64,
}

impl SpeakerRecord {
    /// Start a record from the speaker's first segment
    pub fn new(speaker_id: impl Into<String>, first: SegmentResult) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            transcript: first.text.clone(),
            segments: vec![first],
            positive_pct: 0.0,
            negative_pct: 0.0,
            neutral_pct: 0.0,
        }
    }

    /// Sum of the three percentages
    pub fn pct_total(&self) -> f64 {
        self.positive_pct + self.negative_pct + self.neutral_pct
    }
}

/// Speaker records keyed by speaker id, in first-appearance order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakerSummaries {
    records: Vec<SpeakerRecord>,
    index: HashMap<String, usize>,
}

impl SpeakerSummaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, speaker_id: &str) -> Option<&SpeakerRecord> {
        self.index.get(speaker_id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, speaker_id: &str) -> Option<&mut SpeakerRecord> {
        match self.index.get(speaker_id) {
            Some(&i) => Some(&mut self.records[i]),
            None => None,
        }
    }

    /// Insert a new record at the end; an existing id keeps its position
    /// and is replaced in place.
    pub fn insert(&mut self, record: SpeakerRecord) {
        match self.index.get(&record.speaker_id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.speaker_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Speaker ids in first-appearance order
    pub fn speaker_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.speaker_id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpeakerRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SpeakerRecord> {
        self.records.iter_mut()
    }
}

impl<'a> IntoIterator for &'a SpeakerSummaries {
    type Item = &'a SpeakerRecord;
    type IntoIter = std::slice::Iter<'a, SpeakerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// A JSON object whose key order is the insertion order.
impl Serialize for SpeakerSummaries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.speaker_id, record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_result(text: &str) -> SegmentResult {
        SegmentResult {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
            sentiment: SentimentLabel::Neutral,
            confidence: 50.0,
        }
    }

    #[test]
    fn test_summaries_keep_insertion_order() {
        let mut summaries = SpeakerSummaries::new();
        for id in ["SPEAKER_02", "SPEAKER_00", "SPEAKER_01"] {
            summaries.insert(SpeakerRecord::new(id, segment_result(id)));
        }

        let ids: Vec<&str> = summaries.speaker_ids().collect();
        assert_eq!(ids, vec!["SPEAKER_02", "SPEAKER_00", "SPEAKER_01"]);
    }

    #[test]
    fn test_insert_existing_keeps_position() {
        let mut summaries = SpeakerSummaries::new();
        summaries.insert(SpeakerRecord::new("B", segment_result("first")));
        summaries.insert(SpeakerRecord::new("A", segment_result("a")));
        summaries.insert(SpeakerRecord::new("B", segment_result("replaced")));

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries.iter().next().unwrap().transcript, "replaced");
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let mut summaries = SpeakerSummaries::new();
        summaries.insert(SpeakerRecord::new("Z", segment_result("last letter")));
        summaries.insert(SpeakerRecord::new("A", segment_result("first letter")));

        let json = serde_json::to_string(&summaries).unwrap();
        let z = json.find("\"Z\"").unwrap();
        let a = json.find("\"A\"").unwrap();
        assert!(z < a, "insertion order must survive serialization: {}", json);
        assert!(!json.contains("speaker_id"));
        assert!(json.contains("\"positive\":0.0"));
    }
}

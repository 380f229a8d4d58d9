//! Speaker aggregation: fold per-segment results into per-speaker summaries.

use crate::domain::{round2, SegmentResult, SentimentLabel, SpeakerRecord, SpeakerSummaries};

/// Accumulates segment results in processing order
#[derive(Debug, Default)]
pub struct SpeakerAggregator {
    summaries: SpeakerSummaries,
    dropped: usize,
}

impl SpeakerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one segment for `speaker`. Empty text is dropped.
    pub fn push(&mut self, speaker: &str, segment: SegmentResult) {
        if segment.text.trim().is_empty() {
            self.dropped += 1;
            return;
        }

        match self.summaries.get_mut(speaker) {
            Some(record) => {
                record.transcript.push(' ');
                record.transcript.push_str(&segment.text);
                record.segments.push(segment);
            }
            None => self.summaries.insert(SpeakerRecord::new(speaker, segment)),
        }
    }

    /// Segments accepted so far
    pub fn segment_count(&self) -> usize {
        self.summaries.iter().map(|r| r.segments.len()).sum()
    }

    /// Segments rejected for empty text
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Compute each speaker's sentiment distribution and return the summaries
    pub fn finish(mut self) -> SpeakerSummaries {
        for record in self.summaries.iter_mut() {
            apply_distribution(record);
        }
        self.summaries
    }
}

/// Confidence-weighted share of each sentiment bucket, in percent
fn apply_distribution(record: &mut SpeakerRecord) {
    let (mut positive, mut negative, mut neutral) = (0.0, 0.0, 0.0);

    for segment in &record.segments {
        match segment.sentiment {
            SentimentLabel::Positive => positive += segment.confidence,
            SentimentLabel::Negative => negative += segment.confidence,
            SentimentLabel::Neutral => neutral += segment.confidence,
        }
    }

    let sum = positive + negative + neutral;
    let total = if sum == 0.0 { 1.0 } else { sum };

    record.positive_pct = round2(positive / total * 100.0);
    record.negative_pct = round2(negative / total * 100.0);
    record.neutral_pct = round2(neutral / total * 100.0);
}

/// Aggregate a complete `(speaker, segment)` stream
pub fn aggregate<I, S>(results: I) -> SpeakerSummaries
where
    I: IntoIterator<Item = (S, SegmentResult)>,
    S: AsRef<str>,
{
    let mut aggregator = SpeakerAggregator::new();
    for (speaker, segment) in results {
        aggregator.push(speaker.as_ref(), segment);
    }
    aggregator.finish()
}

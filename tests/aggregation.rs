//! Aggregation Integration Tests
//!
//! Tests for the threshold policy feeding the speaker aggregator.

use call_feedback::core::{aggregate, SpeakerAggregator};
use call_feedback::domain::{
    DiarizationSegment, RawSentiment, SegmentResult, SentimentLabel, SentimentResult,
    SENTIMENT_THRESHOLD,
};

fn scored(speaker: &str, start: f64, end: f64, text: &str, label: &str, score: f64) -> (String, SegmentResult) {
    let segment = DiarizationSegment::new(speaker, start, end);
    let sentiment = SentimentResult::classify(&RawSentiment::new(label, score), SENTIMENT_THRESHOLD).unwrap();
    (speaker.to_string(), SegmentResult::new(&segment, text, sentiment))
}

#[test]
fn test_two_speaker_scenario() {
    // the empty third segment never reaches the aggregator's output
    let summaries = aggregate(vec![
        scored("A", 0.0, 2.0, "hello", "POSITIVE", 0.9),
        scored("B", 2.0, 4.0, "world", "NEGATIVE", 0.5),
        scored("A", 4.0, 5.0, "", "NEUTRAL", 0.99),
    ]);

    let a = summaries.get("A").unwrap();
    assert_eq!(a.transcript, "hello");
    assert_eq!(a.segments.len(), 1);
    assert_eq!(a.positive_pct, 100.0);
    assert_eq!(a.negative_pct, 0.0);
    assert_eq!(a.neutral_pct, 0.0);

    let b = summaries.get("B").unwrap();
    assert_eq!(b.transcript, "world");
    assert_eq!(b.segments[0].sentiment, SentimentLabel::Neutral);
    assert_eq!(b.segments[0].confidence, 50.0);
    assert_eq!(b.neutral_pct, 100.0);
}

#[test]
fn test_percentages_sum_to_100() {
    let labels = ["POSITIVE", "NEGATIVE", "NEUTRAL", "POSITIVE", "NEGATIVE"];
    let scores = [0.91, 0.63, 0.77, 0.42, 0.999];

    let stream: Vec<_> = labels
        .iter()
        .zip(scores.iter())
        .enumerate()
        .map(|(i, (label, score))| {
            let start = i as f64;
            scored("S", start, start + 1.0, &format!("utterance {}", i), label, *score)
        })
        .collect();

    let summaries = aggregate(stream);
    let record = summaries.get("S").unwrap();
    assert!(
        (record.pct_total() - 100.0).abs() <= 0.01 + 1e-9,
        "sum was {}",
        record.pct_total()
    );
}

#[test]
fn test_aggregation_is_idempotent() {
    let stream = vec![
        scored("SPEAKER_01", 3.0, 4.5, "thanks for calling", "POSITIVE", 0.88),
        scored("SPEAKER_00", 0.0, 3.0, "my order is late", "NEGATIVE", 0.93),
        scored("SPEAKER_01", 4.5, 6.0, "let me check", "NEUTRAL", 0.71),
    ];

    let first = serde_json::to_string(&aggregate(stream.clone())).unwrap();
    let second = serde_json::to_string(&aggregate(stream)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_processing_order_is_kept() {
    // later in time, earlier in the stream
    let summaries = aggregate(vec![
        scored("A", 10.0, 11.0, "second", "POSITIVE", 0.9),
        scored("A", 0.0, 1.0, "first", "POSITIVE", 0.9),
    ]);

    let a = summaries.get("A").unwrap();
    assert_eq!(a.transcript, "second first");
    assert_eq!(a.segments[0].start, 10.0);
}

#[test]
fn test_speaker_order_is_first_appearance() {
    let summaries = aggregate(vec![
        scored("SPEAKER_02", 0.0, 1.0, "one", "POSITIVE", 0.9),
        scored("SPEAKER_00", 1.0, 2.0, "two", "POSITIVE", 0.9),
        scored("SPEAKER_02", 2.0, 3.0, "three", "POSITIVE", 0.9),
    ]);

    let ids: Vec<&str> = summaries.speaker_ids().collect();
    assert_eq!(ids, vec!["SPEAKER_02", "SPEAKER_00"]);
}

#[test]
fn test_report_wire_shape() {
    let mut aggregator = SpeakerAggregator::new();
    let (speaker, result) = scored("SPEAKER_00", 0.0, 2.0, "great service", "POSITIVE", 0.93123);
    aggregator.push(&speaker, result);

    let value = serde_json::to_value(aggregator.finish()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "SPEAKER_00": {
                "transcript": "great service",
                "segments": [{
                    "start": 0.0,
                    "end": 2.0,
                    "text": "great service",
                    "sentiment": "POSITIVE",
                    "confidence": 93.12
                }],
                "positive": 100.0,
                "negative": 0.0,
                "neutral": 0.0
            }
        })
    );
}

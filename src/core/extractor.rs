//! Segment extraction: cut one speaker turn out of the source recording.
//!
//! Offsets are truncated to whole milliseconds and then converted to frame
//! indices, so clips are byte-for-byte reproducible for a given segment list.
//! Slices are clamped to the available audio instead of failing.

use std::io::{Cursor, Read};
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tokio::process::Command;

use crate::domain::DiarizationSegment;

/// Interleaved samples in the source's sample format
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Self::Int(s) => s.len(),
            Self::Float(s) => s.len(),
        }
    }

    fn slice(&self, from: usize, to: usize) -> Self {
        match self {
            Self::Int(s) => Self::Int(s[from..to].to_vec()),
            Self::Float(s) => Self::Float(s[from..to].to_vec()),
        }
    }
}

/// Decoded source recording
#[derive(Debug, Clone)]
pub struct SourceAudio {
    spec: WavSpec,
    samples: Samples,
}

impl SourceAudio {
    /// Decode WAV data from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav_reader = WavReader::new(reader).context("Failed to parse WAV data")?;
        let spec = wav_reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(
                wav_reader
                    .samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .context("Failed to read WAV samples")?,
            ),
            SampleFormat::Float => Samples::Float(
                wav_reader
                    .samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .context("Failed to read WAV samples")?,
            ),
        };

        Ok(Self { spec, samples })
    }

    /// Decode an in-memory WAV file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Decode a WAV file on disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to decode audio file: {}", path.display()))
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels.max(1) as usize
    }

    /// Duration in whole milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / self.spec.sample_rate.max(1) as u64
    }
}

/// Audio for one segment, in the source's format
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    spec: WavSpec,
    samples: Samples,
}

impl AudioClip {
    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.len() == 0
    }

    pub fn duration_ms(&self) -> u64 {
        self.frames() as u64 * 1000 / self.spec.sample_rate.max(1) as u64
    }

    fn write_to<W: std::io::Write + std::io::Seek>(&self, writer: W) -> Result<()> {
        let mut wav = WavWriter::new(writer, self.spec).context("Failed to start WAV clip")?;
        match &self.samples {
            Samples::Int(samples) => {
                for &sample in samples {
                    wav.write_sample(sample).context("Failed to write WAV sample")?;
                }
            }
            Samples::Float(samples) => {
                for &sample in samples {
                    wav.write_sample(sample).context("Failed to write WAV sample")?;
                }
            }
        }
        wav.finalize().context("Failed to finalize WAV clip")
    }

    /// Write the clip as a WAV file
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create clip file: {}", path.display()))?;
        self.write_to(std::io::BufWriter::new(file))
            .with_context(|| format!("Failed to write clip: {}", path.display()))
    }

    /// Encode the clip as an in-memory WAV file
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

/// Frame index for a millisecond offset (integer floor, saturating)
pub fn frame_offset(ms: u64, sample_rate: u32) -> usize {
    let frame = ms as u128 * sample_rate as u128 / 1000;
    usize::try_from(frame).unwrap_or(usize::MAX)
}

/// Cuts speaker turns out of a source recording
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentExtractor;

impl SegmentExtractor {
    /// Slice `[start, end)` of `segment` out of `audio`.
    ///
    /// Never fails: offsets past the end of the audio shorten the clip, and
    /// an inverted or fully out-of-range segment yields an empty clip.
    pub fn extract(audio: &SourceAudio, segment: &DiarizationSegment) -> AudioClip {
        let spec = audio.spec;
        let channels = spec.channels.max(1) as usize;
        let frames = audio.frames();

        let start = frame_offset(segment.start_ms(), spec.sample_rate).min(frames);
        let end = frame_offset(segment.end_ms(), spec.sample_rate)
            .min(frames)
            .max(start);

        AudioClip {
            spec,
            samples: audio.samples.slice(start * channels, end * channels),
        }
    }
}

/// Whether `bytes` look like a RIFF/WAVE file
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Convert any ffmpeg-readable audio file to WAV
pub async fn convert_to_wav(ffmpeg: &Path, input: &Path, output: &Path) -> Result<()> {
    let result = Command::new(ffmpeg)
        .args(["-nostdin", "-y", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-f", "wav"])
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to run ffmpeg ({})", ffmpeg.display()))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!(
            "ffmpeg could not convert {} to WAV: {}",
            input.display(),
            stderr.trim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_frame_offset() {
        assert_eq!(frame_offset(1000, 16000), 16000);
        assert_eq!(frame_offset(1, 44100), 44);
        assert_eq!(frame_offset(0, 8000), 0);
        assert_eq!(frame_offset(u64::MAX, 48000), usize::MAX);
    }

    #[test]
    fn test_extract_mono() {
        // 1kHz: one frame per millisecond
        let samples: Vec<i16> = (0..1000).collect();
        let audio = SourceAudio::from_bytes(&make_wav(1000, 1, &samples)).unwrap();

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.1, 0.25));
        assert_eq!(clip.frames(), 150);
        assert_eq!(
            clip.samples(),
            &Samples::Int((100..250).collect::<Vec<i32>>())
        );
    }

    #[test]
    fn test_extract_truncates_sub_millisecond_offsets() {
        let samples: Vec<i16> = (0..1000).collect();
        let audio = SourceAudio::from_bytes(&make_wav(1000, 1, &samples)).unwrap();

        // 0.1009s -> 100ms, 0.2009s -> 200ms
        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.1009, 0.2009));
        assert_eq!(clip.frames(), 100);
        match clip.samples() {
            Samples::Int(s) => assert_eq!(s[0], 100),
            other => panic!("unexpected samples: {:?}", other),
        }
    }

    #[test]
    fn test_extract_stereo_keeps_frames_together() {
        // 2 channels at 1kHz, left = n, right = -n
        let samples: Vec<i16> = (0..100).flat_map(|n| [n, -n]).collect();
        let audio = SourceAudio::from_bytes(&make_wav(1000, 2, &samples)).unwrap();
        assert_eq!(audio.frames(), 100);

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.010, 0.012));
        assert_eq!(clip.samples(), &Samples::Int(vec![10, -10, 11, -11]));
    }

    #[test]
    fn test_extract_past_end_is_shortened() {
        let audio = SourceAudio::from_bytes(&make_wav(1000, 1, &[1; 500])).unwrap();

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.4, 2.0));
        assert_eq!(clip.frames(), 100);

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 1.0, 2.0));
        assert!(clip.is_empty());
    }

    #[test]
    fn test_huge_end_is_clamped_to_audio() {
        let audio = SourceAudio::from_bytes(&make_wav(48000, 1, &[1; 48000])).unwrap();

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.5, 1.0e15));
        assert_eq!(clip.frames(), 24000);

        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 1.0e15, 2.0e15));
        assert!(clip.is_empty());
    }

    #[test]
    fn test_inverted_segment_is_empty() {
        let audio = SourceAudio::from_bytes(&make_wav(1000, 1, &[1; 500])).unwrap();
        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.3, 0.1));
        assert!(clip.is_empty());
    }

    #[test]
    fn test_clip_round_trips_through_wav() {
        let samples: Vec<i16> = (0..800).map(|n| (n * 7 % 300) as i16).collect();
        let audio = SourceAudio::from_bytes(&make_wav(8000, 1, &samples)).unwrap();
        let clip = SegmentExtractor::extract(&audio, &DiarizationSegment::new("A", 0.01, 0.05));

        let decoded = SourceAudio::from_bytes(&clip.to_wav_bytes().unwrap()).unwrap();
        assert_eq!(decoded.spec(), clip.spec());
        assert_eq!(decoded.frames(), clip.frames());
        assert_eq!(decoded.duration_ms(), 40);
    }

    #[test]
    fn test_is_wav() {
        assert!(is_wav(&make_wav(8000, 1, &[0; 4])));
        assert!(!is_wav(b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00"));
        assert!(!is_wav(b"RIFF"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SourceAudio::from_bytes(b"definitely not audio").is_err());
    }
}

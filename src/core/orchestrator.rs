//! Main orchestrator for call analysis.
//!
//! Sequences one request through store, diarize, per-segment
//! extract/transcribe/score, and aggregation. Every step failure aborts the
//! request and is reported through a single `{error}` report; transient files
//! are released on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    AudioStore, AzureBlobStore, CommandSentimentClassifier, DiarizationApi, PyannoteClient,
    SentimentClassifier, Transcriber, WhisperTranscriber,
};
use crate::config::ResolvedConfig;
use crate::domain::{
    AnalysisReport, AudioUpload, DiarizationSegment, PipelineState, Run, SegmentResult,
    SentimentResult, SpeakerSummaries, SENTIMENT_THRESHOLD,
};

use super::aggregator::SpeakerAggregator;
use super::diarization::{DiarizationJobClient, PollPolicy};
use super::error::AnalysisError;
use super::extractor::{convert_to_wav, is_wav, SegmentExtractor, SourceAudio};
use super::workspace::{sanitize_component, RequestWorkspace};

/// Per-process pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Root for per-request workspaces
    pub work_dir: PathBuf,

    /// ffmpeg binary used for non-WAV uploads
    pub ffmpeg_path: PathBuf,

    /// Largest accepted upload
    pub max_upload_bytes: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("call-feedback"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl From<&ResolvedConfig> for OrchestratorSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            ffmpeg_path: config.audio.ffmpeg_path.clone(),
            max_upload_bytes: config.audio.max_upload_bytes,
        }
    }
}

/// Result of one request together with its state history
#[derive(Debug)]
pub struct RunOutcome {
    pub run: Run,
    pub result: Result<SpeakerSummaries, AnalysisError>,
}

impl RunOutcome {
    /// Convert to the caller-facing report
    pub fn into_report(self) -> AnalysisReport {
        match self.result {
            Ok(speakers) => AnalysisReport::Success { speakers },
            Err(e) => AnalysisReport::Failure {
                error: e.to_string(),
                kind: e.kind(),
            },
        }
    }
}

/// Main analysis orchestrator, shared across requests
pub struct Orchestrator {
    store: Arc<dyn AudioStore>,
    diarizer: DiarizationJobClient,
    transcriber: Arc<dyn Transcriber>,
    classifier: Arc<dyn SentimentClassifier>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator from already-built adapters
    pub fn new(
        store: Arc<dyn AudioStore>,
        diarizer: DiarizationJobClient,
        transcriber: Arc<dyn Transcriber>,
        classifier: Arc<dyn SentimentClassifier>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            diarizer,
            transcriber,
            classifier,
            settings,
        }
    }

    /// Build the shipped adapters from configuration and the environment
    pub fn from_config(config: &ResolvedConfig) -> anyhow::Result<Self> {
        let account = config
            .storage
            .account
            .clone()
            .context("storage.account is not configured")?;
        let store = AzureBlobStore::from_env(
            account,
            config.storage.container.clone(),
            config.storage.endpoint.clone(),
        )?;

        let api: Arc<dyn DiarizationApi> =
            Arc::new(PyannoteClient::from_env(config.diarization.endpoint.clone())?);
        let mut policy = PollPolicy::new(config.diarization.poll_interval);
        policy.max_wait = config.diarization.max_wait;

        let mut transcriber = WhisperTranscriber::new(
            config.transcription.whisper_path.clone(),
            config.transcription.model.clone(),
        );
        if let Some(ref language) = config.transcription.language {
            transcriber = transcriber.with_language(language.clone());
        }

        let command = config
            .sentiment
            .command
            .clone()
            .context("sentiment.command is not configured")?;
        let classifier = CommandSentimentClassifier::new(command)
            .with_args(config.sentiment.args.clone())
            .with_timeout(config.sentiment.timeout);

        Ok(Self::new(
            Arc::new(store),
            DiarizationJobClient::new(api, policy),
            Arc::new(transcriber),
            Arc::new(classifier),
            OrchestratorSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Analyze one upload and return the caller-facing report
    pub async fn analyze(&self, upload: Option<AudioUpload>) -> AnalysisReport {
        self.execute(upload).await.into_report()
    }

    /// Analyze one upload, keeping the run history alongside the result
    pub async fn execute(&self, upload: Option<AudioUpload>) -> RunOutcome {
        self.execute_request(Uuid::new_v4(), upload).await
    }

    #[instrument(skip(self, request_id, upload), fields(request_id = %request_id))]
    async fn execute_request(&self, request_id: Uuid, upload: Option<AudioUpload>) -> RunOutcome {
        let mut run = Run::new(request_id);
        info!("Analysis request received");

        let upload = match self.validate_upload(upload) {
            Ok(upload) => upload,
            Err(e) => return finish(run, Err(e)),
        };

        let mut workspace = match RequestWorkspace::create(&self.settings.work_dir, request_id) {
            Ok(workspace) => workspace,
            Err(e) => {
                let e = AnalysisError::Internal(format!(
                    "Failed to create workspace in {}: {}",
                    self.settings.work_dir.display(),
                    e
                ));
                return finish(run, Err(e));
            }
        };

        let result = self.run_steps(&mut run, &mut workspace, &upload).await;

        // release everything before the terminal transition
        if let Err(e) = workspace.close() {
            warn!(error = %e, "Failed to close request workspace");
        }

        finish(run, result)
    }

    fn validate_upload(&self, upload: Option<AudioUpload>) -> Result<AudioUpload, AnalysisError> {
        let upload = upload.ok_or_else(|| AnalysisError::Input("No audio uploaded".to_string()))?;

        if upload.is_empty() {
            return Err(AnalysisError::Input("Uploaded audio is empty".to_string()));
        }
        if upload.len() as u64 > self.settings.max_upload_bytes {
            return Err(AnalysisError::Input(format!(
                "Uploaded audio is too large: {} bytes (limit {})",
                upload.len(),
                self.settings.max_upload_bytes
            )));
        }

        Ok(upload)
    }

    async fn run_steps(
        &self,
        run: &mut Run,
        workspace: &mut RequestWorkspace,
        upload: &AudioUpload,
    ) -> Result<SpeakerSummaries, AnalysisError> {
        let staged = workspace
            .stage_upload(&upload.bytes, &upload.filename)
            .context("Failed to stage uploaded audio")
            .map_err(AnalysisError::Storage)?;

        let blob_name = format!("{}_{}", run.id, base_name(&upload.filename));
        let audio_ref = self
            .store
            .store(&upload.bytes, &blob_name)
            .await
            .map_err(AnalysisError::Storage)?;
        run.advance(PipelineState::Stored)?;
        info!(blob = %blob_name, store = self.store.name(), "Audio stored");

        run.advance(PipelineState::Diarizing)?;
        let segments = self.diarizer.diarize(&audio_ref).await?;
        info!(
            segments = segments.len(),
            backend = self.diarizer.backend(),
            "Diarization complete"
        );

        // segments are non-empty here; an empty list is a malformed result
        run.advance(PipelineState::Extracting)?;
        let source = self.load_source(workspace, &staged, &upload.bytes).await?;
        debug!(
            frames = source.frames(),
            duration_ms = source.duration_ms(),
            "Decoded source audio"
        );

        let mut aggregator = SpeakerAggregator::new();

        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                run.advance(PipelineState::Extracting)?;
            }

            match self.process_segment(run, workspace, &source, segment).await? {
                Some(result) => aggregator.push(&segment.speaker, result),
                None => run.segments_dropped += 1,
            }
            run.segments_processed += 1;
        }

        run.advance(PipelineState::Aggregating)?;
        let summaries = aggregator.finish();
        info!(
            speakers = summaries.len(),
            segments = run.segments_processed,
            dropped = run.segments_dropped,
            "Aggregated speaker summaries"
        );

        Ok(summaries)
    }

    /// Extract, transcribe and score one segment. `None` means the segment
    /// had no speech and is dropped.
    async fn process_segment(
        &self,
        run: &mut Run,
        workspace: &mut RequestWorkspace,
        source: &SourceAudio,
        segment: &DiarizationSegment,
    ) -> Result<Option<SegmentResult>, AnalysisError> {
        let start_ms = segment.start_ms();
        let clip = SegmentExtractor::extract(source, segment);

        if clip.is_empty() {
            run.advance(PipelineState::Transcribing)?;
            debug!(speaker = %segment.speaker, start_ms, "Segment has no audio, dropping");
            return Ok(None);
        }

        let clip_path = workspace.clip_path(&segment.speaker, start_ms);
        clip.write_wav(&clip_path).map_err(AnalysisError::Extraction)?;

        run.advance(PipelineState::Transcribing)?;
        let transcript = self.transcriber.transcribe(&clip_path).await;

        if let Err(e) = workspace.release(&clip_path) {
            warn!(path = %clip_path.display(), error = %e, "Failed to release clip");
        }

        let transcript = transcript.map_err(AnalysisError::Transcription)?;
        let text = transcript.text.trim();
        if text.is_empty() {
            debug!(speaker = %segment.speaker, start_ms, "Empty transcript, dropping segment");
            return Ok(None);
        }

        run.advance(PipelineState::Scoring)?;
        let raw = self
            .classifier
            .predict(text)
            .await
            .map_err(AnalysisError::Sentiment)?;
        let sentiment = SentimentResult::classify(&raw, SENTIMENT_THRESHOLD)
            .map_err(|e| AnalysisError::Sentiment(e.into()))?;

        debug!(
            speaker = %segment.speaker,
            start_ms,
            label = %sentiment.label,
            confidence = sentiment.confidence,
            "Scored segment"
        );

        Ok(Some(SegmentResult::new(segment, text, sentiment)))
    }

    /// Decode the upload, converting through ffmpeg when it is not PCM WAV
    async fn load_source(
        &self,
        workspace: &mut RequestWorkspace,
        staged: &Path,
        bytes: &[u8],
    ) -> Result<SourceAudio, AnalysisError> {
        if is_wav(bytes) {
            match SourceAudio::from_bytes(bytes) {
                Ok(source) => return Ok(source),
                // e.g. G.711 mu-law/A-law, which ffmpeg still decodes
                Err(e) => debug!(error = %e, "WAV not decodable directly, converting"),
            }
        }

        let converted = workspace.converted_path();
        convert_to_wav(&self.settings.ffmpeg_path, staged, &converted)
            .await
            .map_err(AnalysisError::Extraction)?;

        let source = SourceAudio::open(&converted).map_err(AnalysisError::Extraction);
        if let Err(e) = workspace.release(&converted) {
            warn!(path = %converted.display(), error = %e, "Failed to release converted audio");
        }
        source
    }
}

/// File name without directories, safe for blob names
fn base_name(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_component(&name)
}

/// Move the run to its terminal state
fn finish(mut run: Run, result: Result<SpeakerSummaries, AnalysisError>) -> RunOutcome {
    let result = match result {
        Ok(summaries) => match run.advance(PipelineState::Done) {
            Ok(()) => Ok(summaries),
            Err(e) => Err(AnalysisError::from(e)),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(summaries) => {
            info!(speakers = summaries.len(), "Analysis complete");
            RunOutcome {
                run,
                result: Ok(summaries),
            }
        }
        Err(e) => {
            error!(kind = %e.kind(), error = %e, "Analysis failed");
            run.fail(e.kind(), e.to_string());
            RunOutcome { run, result: Err(e) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("/uploads/tmp/call 1.wav"), "call_1.wav");
        assert_eq!(base_name("recording.mp3"), "recording.mp3");
        assert_eq!(base_name(""), "audio");
    }

    #[test]
    fn test_settings_from_config() {
        let config = ResolvedConfig::default();
        let settings = OrchestratorSettings::from(&config);
        assert_eq!(settings.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(settings, OrchestratorSettings::default());
    }

    #[test]
    fn test_failed_outcome_report() {
        let outcome = finish(
            Run::new(Uuid::new_v4()),
            Err(AnalysisError::Input("No audio uploaded".to_string())),
        );
        assert!(outcome.run.is_finished());

        let report = outcome.into_report();
        assert_eq!(report.status_code(), 400);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({ "error": "No audio uploaded" })
        );
    }
}

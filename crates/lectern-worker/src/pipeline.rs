//! The processing pipeline for one video run.
//!
//! Stages run strictly in sequence:
//! downloading -> transcoding -> uploading -> analyzing -> rescaling ->
//! embedding -> persisting -> cleaning_up -> done | failed.
//!
//! The only loops are the retry sub-loops inside model invocation and
//! response validation; they never move the run's own stage. Cleanup is
//! entered from every terminal path, and a failure at any stage surfaces
//! as a structured outcome, never as a panic or error to the caller.

use std::path::Path;
use std::sync::Arc;

use tracing::Instrument;

use lectern_media::{
    probe_duration, produce_derivatives, select_strategy, MediaResult, TranscodeOutput,
    DEFAULT_DURATION_SECS,
};
use lectern_models::{
    rescale_chapters, AnalysisResult, CompressionStrategy, ProcessingOutcome, ProcessingStage,
    VideoId,
};
use lectern_storage::{local_path_for_key, SourceBucket};

use crate::config::WorkerConfig;
use crate::embeddings::{embed_analysis, EmbeddingBackend};
use crate::error::{WorkerError, WorkerResult};
use crate::gemini::{RemoteFile, RemoteFileStore};
use crate::invoker::{GenerativeBackend, ModelInvoker};
use crate::logging::RunLogger;
use crate::prompts::analysis_prompt;
use crate::scratch::ScratchSpace;
use crate::sink::OutcomeSink;
use crate::validator::analyze_with_healing;

/// Source of video files, fetched by object key.
#[async_trait::async_trait]
pub trait SourceStore: Send + Sync {
    async fn fetch(&self, key: &str, dest: &Path) -> WorkerResult<()>;
}

#[async_trait::async_trait]
impl SourceStore for SourceBucket {
    async fn fetch(&self, key: &str, dest: &Path) -> WorkerResult<()> {
        self.download_to_path(key, dest).await?;
        Ok(())
    }
}

/// Media probing and derivative production.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    async fn probe(&self, path: &Path) -> Option<f64>;

    async fn produce(
        &self,
        source: &Path,
        strategy: CompressionStrategy,
        duration_secs: f64,
    ) -> MediaResult<TranscodeOutput>;
}

/// Default transcoder shelling out to FFmpeg.
#[derive(Debug, Default)]
pub struct FfmpegTranscoder;

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self, path: &Path) -> Option<f64> {
        probe_duration(path).await
    }

    async fn produce(
        &self,
        source: &Path,
        strategy: CompressionStrategy,
        duration_secs: f64,
    ) -> MediaResult<TranscodeOutput> {
        produce_derivatives(source, strategy, duration_secs).await
    }
}

/// One-video-at-a-time processing pipeline.
///
/// Multiple pipelines may run concurrently for different videos; they
/// share nothing but the sink, and derivatives are private to each run.
pub struct VideoPipeline<G>
where
    G: GenerativeBackend + EmbeddingBackend + RemoteFileStore,
{
    storage: Arc<dyn SourceStore>,
    transcoder: Arc<dyn Transcoder>,
    gemini: G,
    sink: Arc<dyn OutcomeSink>,
    config: WorkerConfig,
}

impl<G> VideoPipeline<G>
where
    G: GenerativeBackend + EmbeddingBackend + RemoteFileStore,
{
    pub fn new(
        storage: Arc<dyn SourceStore>,
        gemini: G,
        sink: Arc<dyn OutcomeSink>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            storage,
            transcoder: Arc::new(FfmpegTranscoder),
            gemini,
            sink,
            config,
        }
    }

    /// Replace the FFmpeg transcoder.
    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Process one video to a terminal outcome.
    ///
    /// Never returns an error: every failure is finalized into the
    /// outcome, handed to the sink, and followed by cleanup.
    pub async fn process(&self, video_id: VideoId, object_key: &str) -> ProcessingOutcome {
        let logger = RunLogger::new(&video_id);
        let span = logger.create_span();
        self.process_inner(logger, video_id, object_key)
            .instrument(span)
            .await
    }

    async fn process_inner(
        &self,
        logger: RunLogger,
        video_id: VideoId,
        object_key: &str,
    ) -> ProcessingOutcome {
        let mut scratch = ScratchSpace::new();
        let mut uploads: Vec<RemoteFile> = Vec::new();

        let outcome = match self
            .run(&logger, &video_id, object_key, &mut scratch, &mut uploads)
            .await
        {
            Ok(outcome) => outcome,
            Err((stage, e)) => {
                logger.log_error(stage, &format!("Run failed: {}", e));
                let outcome = ProcessingOutcome::failed(stage, e.to_string());
                // The failure reason still goes to the collaborator;
                // errors here must not mask the original failure.
                if let Err(record_err) = self.sink.record(&video_id, &outcome).await {
                    logger.log_warning(
                        ProcessingStage::Failed,
                        &format!("Could not record failure: {}", record_err),
                    );
                }
                outcome
            }
        };

        // CleaningUp runs on every terminal path, success or not.
        logger.log_stage(ProcessingStage::CleaningUp, "Removing transient artifacts");
        scratch.cleanup().await;
        for file in &uploads {
            if let Err(e) = self.gemini.delete(&file.name).await {
                logger.log_warning(
                    ProcessingStage::CleaningUp,
                    &format!("Could not delete remote file {}: {}", file.name, e),
                );
            }
        }

        let terminal = if outcome.is_success() {
            ProcessingStage::Done
        } else {
            ProcessingStage::Failed
        };
        logger.log_stage(terminal, "Run reached terminal state");
        outcome
    }

    /// The sequential happy path. Any error is tagged with the stage the
    /// run was in when it occurred.
    async fn run(
        &self,
        logger: &RunLogger,
        video_id: &VideoId,
        object_key: &str,
        scratch: &mut ScratchSpace,
        uploads: &mut Vec<RemoteFile>,
    ) -> Result<ProcessingOutcome, (ProcessingStage, WorkerError)> {
        use ProcessingStage as Stage;

        // Downloading
        logger.log_stage(Stage::Downloading, &format!("Fetching {}", object_key));
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| (Stage::Downloading, WorkerError::from(e)))?;
        let local = local_path_for_key(&self.config.work_dir, object_key)
            .map_err(|e| (Stage::Downloading, WorkerError::from(e)))?;
        self.storage
            .fetch(object_key, &local)
            .await
            .map_err(|e| (Stage::Downloading, e))?;
        scratch.register(&local);

        // Transcoding (includes probing and strategy selection)
        let duration = match self.transcoder.probe(&local).await {
            Some(d) => d,
            None => {
                logger.log_warning(
                    Stage::Transcoding,
                    &format!("Duration unknown, assuming {:.0}s", DEFAULT_DURATION_SECS),
                );
                DEFAULT_DURATION_SECS
            }
        };
        let strategy = select_strategy(duration, self.config.long_video_mode);
        logger.log_stage(
            Stage::Transcoding,
            &format!("Strategy {} for {:.0}s video", strategy, duration),
        );
        let transcode = self
            .transcoder
            .produce(&local, strategy, duration)
            .await
            .map_err(|e| (Stage::Transcoding, WorkerError::from(e)))?;
        if let Some(from) = transcode.degraded_from {
            logger.log_warning(
                Stage::Transcoding,
                &format!("Degraded from {} to {}", from, transcode.strategy),
            );
        }
        for derivative in &transcode.derivatives {
            scratch.register(&derivative.path);
        }

        // Uploading
        logger.log_stage(
            Stage::Uploading,
            &format!("Uploading {} derivative(s)", transcode.derivatives.len()),
        );
        for derivative in &transcode.derivatives {
            let file = self
                .gemini
                .upload(&derivative.path)
                .await
                .map_err(|e| (Stage::Uploading, e))?;
            uploads.push(file);
        }

        // Analyzing (model fallback and self-healing loops live inside)
        logger.log_stage(
            Stage::Analyzing,
            &format!("Analyzing as {}", transcode.strategy),
        );
        let prompt = analysis_prompt(transcode.strategy);
        let invoker = ModelInvoker::new(
            &self.gemini,
            &self.config.candidate_models,
            self.config.rate_limit_cooldown,
            self.config.attempts_per_model,
        );
        let mut analysis = analyze_with_healing(&invoker, uploads.as_slice(), &prompt)
            .await
            .map_err(|e| (Stage::Analyzing, e))?;

        // Rescaling (only when the analyzed timeline was compressed)
        let ratio = transcode.time_ratio();
        if apply_rescaling(&mut analysis, ratio) {
            logger.log_stage(
                Stage::Rescaling,
                &format!("Scaled timestamps by {}x", ratio),
            );
        }

        // Embedding
        logger.log_stage(Stage::Embedding, "Generating embedding");
        let embedding = embed_analysis(&self.gemini, &analysis)
            .await
            .map_err(|e| (Stage::Embedding, e))?;

        // Persisting
        logger.log_stage(Stage::Persisting, "Handing off to catalog");
        let outcome = ProcessingOutcome::Succeeded {
            analysis,
            embedding,
        };
        self.sink
            .record(video_id, &outcome)
            .await
            .map_err(|e| (Stage::Persisting, e))?;

        Ok(outcome)
    }
}

/// Rescale chapter timestamps back to real time when the strategy
/// compressed the timeline. Returns whether rescaling was applied.
fn apply_rescaling(analysis: &mut AnalysisResult, ratio: f64) -> bool {
    if ratio == 1.0 {
        return false;
    }
    analysis.chapters = rescale_chapters(&analysis.chapters, ratio);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use lectern_media::{DerivativeRole, MediaDerivative};
    use lectern_models::{Chapter, EMBEDDING_DIMENSIONS};

    use crate::invoker::InvokeError;

    const VALID: &str = r#"{"transcript_summary":"notes","visual_summary":"slides","chapters":[{"timestamp":"01:00","label":"Intro"}],"tags":["os"]}"#;

    fn analysis_with(timestamps: &[&str]) -> AnalysisResult {
        AnalysisResult {
            transcript_summary: String::new(),
            visual_summary: String::new(),
            chapters: timestamps
                .iter()
                .map(|ts| Chapter {
                    timestamp: ts.to_string(),
                    label: String::new(),
                })
                .collect(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_apply_rescaling_compressed() {
        let mut analysis = analysis_with(&["01:00", "abc"]);
        assert!(apply_rescaling(&mut analysis, 10.0));
        assert_eq!(analysis.chapters[0].timestamp, "10:00");
        assert_eq!(analysis.chapters[1].timestamp, "abc");
        assert_eq!(analysis.chapters.len(), 2);
    }

    #[test]
    fn test_apply_rescaling_identity() {
        let mut analysis = analysis_with(&["01:00"]);
        assert!(!apply_rescaling(&mut analysis, 1.0));
        assert_eq!(analysis.chapters[0].timestamp, "01:00");
    }

    /// Store that materializes a small file at the destination.
    struct StubStore;

    #[async_trait::async_trait]
    impl SourceStore for StubStore {
        async fn fetch(&self, _key: &str, dest: &Path) -> WorkerResult<()> {
            tokio::fs::write(dest, b"source").await?;
            Ok(())
        }
    }

    /// Transcoder that writes one slideshow derivative next to the source.
    struct StubTranscoder;

    #[async_trait::async_trait]
    impl Transcoder for StubTranscoder {
        async fn probe(&self, _path: &Path) -> Option<f64> {
            Some(3600.0)
        }

        async fn produce(
            &self,
            source: &Path,
            strategy: CompressionStrategy,
            _duration_secs: f64,
        ) -> MediaResult<TranscodeOutput> {
            let path = source.with_file_name("lecture_slideshow.mp4");
            tokio::fs::write(&path, b"derivative").await?;
            Ok(TranscodeOutput {
                derivatives: vec![MediaDerivative {
                    path,
                    role: DerivativeRole::Video,
                    time_ratio: 10.0,
                }],
                strategy,
                degraded_from: None,
            })
        }
    }

    /// Backend with a switchable upload failure and a deletion log.
    struct FakeBackend {
        fail_upload: bool,
        deleted: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl GenerativeBackend for FakeBackend {
        async fn generate(
            &self,
            _model: &str,
            _attachments: &[RemoteFile],
            _prompt: &str,
        ) -> Result<String, InvokeError> {
            Ok(VALID.to_string())
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingBackend for FakeBackend {
        async fn embed(&self, _text: &str) -> WorkerResult<Vec<f32>> {
            Ok(vec![0.0; EMBEDDING_DIMENSIONS])
        }
    }

    #[async_trait::async_trait]
    impl RemoteFileStore for FakeBackend {
        async fn upload(&self, _path: &Path) -> WorkerResult<RemoteFile> {
            if self.fail_upload {
                return Err(WorkerError::ai_failed("upload refused"));
            }
            Ok(RemoteFile {
                name: "files/abc123".to_string(),
                uri: "https://files/abc123".to_string(),
                mime_type: "video/mp4".to_string(),
            })
        }

        async fn delete(&self, name: &str) -> WorkerResult<()> {
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    /// Sink that records every handoff.
    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<(VideoId, ProcessingOutcome)>>,
    }

    #[async_trait::async_trait]
    impl OutcomeSink for RecordingSink {
        async fn record(
            &self,
            video_id: &VideoId,
            outcome: &ProcessingOutcome,
        ) -> WorkerResult<()> {
            self.records
                .lock()
                .unwrap()
                .push((video_id.clone(), outcome.clone()));
            Ok(())
        }
    }

    fn test_config(work_dir: &Path) -> WorkerConfig {
        WorkerConfig {
            work_dir: work_dir.to_path_buf(),
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_success_cleans_up_and_records_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = VideoPipeline::new(
            Arc::new(StubStore),
            FakeBackend {
                fail_upload: false,
                deleted: deleted.clone(),
            },
            sink.clone(),
            test_config(dir.path()),
        )
        .with_transcoder(Arc::new(StubTranscoder));

        let outcome = pipeline
            .process(VideoId::from_string("vid-1"), "raw/lecture.mp4")
            .await;

        assert!(outcome.is_success());
        // Every transient file created in the run is gone afterwards
        assert!(!dir.path().join("lecture.mp4").exists());
        assert!(!dir.path().join("lecture_slideshow.mp4").exists());
        // The remote upload was deleted too
        assert_eq!(*deleted.lock().unwrap(), vec!["files/abc123"]);

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, VideoId::from_string("vid-1"));
        match &records[0].1 {
            ProcessingOutcome::Succeeded { analysis, embedding } => {
                // Compressed-timeline chapter rescaled to real time
                assert_eq!(analysis.chapters[0].timestamp, "10:00");
                assert_eq!(embedding.len(), EMBEDDING_DIMENSIONS);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_failure_cleans_up_and_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(RecordingSink::default());
        let pipeline = VideoPipeline::new(
            Arc::new(StubStore),
            FakeBackend {
                fail_upload: true,
                deleted: deleted.clone(),
            },
            sink.clone(),
            test_config(dir.path()),
        )
        .with_transcoder(Arc::new(StubTranscoder));

        let outcome = pipeline
            .process(VideoId::from_string("vid-2"), "raw/lecture.mp4")
            .await;

        assert!(!outcome.is_success());
        // Cleanup still ran: the download and the derivative are gone
        assert!(!dir.path().join("lecture.mp4").exists());
        assert!(!dir.path().join("lecture_slideshow.mp4").exists());
        // Nothing was uploaded, so nothing remote to delete
        assert!(deleted.lock().unwrap().is_empty());

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        match &records[0].1 {
            ProcessingOutcome::Failed { stage, .. } => {
                assert_eq!(*stage, ProcessingStage::Uploading)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}

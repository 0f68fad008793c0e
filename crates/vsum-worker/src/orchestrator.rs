//! Job orchestration.
//!
//! Drives one job through
//! `RECEIVED → DOWNLOADING → EXTRACTING → TRANSCRIBING → SUMMARIZING →
//! (UPLOADING) → REPORTING → DONE | FAILED`.
//!
//! A stage failure skips every later stage and goes straight to reporting.
//! Reporting always runs, and the run ends in a terminal state whether or
//! not the report was delivered. Local artifacts are removed at the end.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{warn, Instrument};
use vsum_ai_client::{truncate_transcript, validate_transcript, MAX_SUMMARY_INPUT_CHARS};
use vsum_media::{remove_files, remove_scratch_dir, AudioFilterStrategy};
use vsum_models::{
    ArtifactRef, ErrorKind, IntakeError, JobIdentity, JobState, Outcome, ProcessingMeta,
    ReportResult, StageName, StageResult,
};
use vsum_storage::{result_key, ResultDocument};

use crate::callback::Reporter;
use crate::collaborators::{MediaTranscoder, ObjectStore, ResultStore, Summarizer, Transcriber};
use crate::config::StageConfig;
use crate::context::JobContext;
use crate::logging::LogStage;
use crate::metrics;
use crate::stage::{Backoff, StageError, StageExecutor, StagePolicy};

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub object_store: Arc<dyn ObjectStore>,
    pub transcoder: Arc<dyn MediaTranscoder>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    /// Upload is skipped when unset
    pub result_store: Option<Arc<dyn ResultStore>>,
    pub reporter: Arc<dyn Reporter>,
}

/// Policy for each working stage.
#[derive(Debug, Clone)]
pub struct StagePolicies {
    pub download: StagePolicy<()>,
    pub extraction: StagePolicy<AudioFilterStrategy>,
    pub transcription: StagePolicy<()>,
    pub summarization: StagePolicy<()>,
    pub upload: StagePolicy<()>,
}

impl StagePolicies {
    /// Network stages retry with backoff; extraction walks the denoiser
    /// chain once; upload is attempted once.
    pub fn from_config(config: &StageConfig) -> Self {
        let backoff = Backoff::new(config.retry_delay, config.max_delay);
        let [primary, fallbacks @ ..] = AudioFilterStrategy::CHAIN;

        Self {
            download: StagePolicy::new((), config.max_attempts, backoff),
            extraction: StagePolicy::single_attempt(primary).with_fallbacks(fallbacks),
            transcription: StagePolicy::new((), config.max_attempts, backoff),
            summarization: StagePolicy::new((), config.max_attempts, backoff),
            upload: StagePolicy::single_attempt(()),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub final_state: JobState,
    pub report: ReportResult,
}

/// Runs jobs to completion. Shared by every message loop; holds no per-job
/// state.
pub struct JobOrchestrator {
    collaborators: Collaborators,
    policies: StagePolicies,
    expected_bucket: Option<String>,
}

impl JobOrchestrator {
    pub fn new(collaborators: Collaborators, policies: StagePolicies) -> Self {
        Self {
            collaborators,
            policies,
            expected_bucket: None,
        }
    }

    /// Warn about jobs whose source is not in `bucket`.
    pub fn with_expected_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.expected_bucket = Some(bucket.into());
        self
    }

    /// Run one job and report its outcome.
    pub async fn run(&self, identity: JobIdentity) -> RunSummary {
        let mut ctx = JobContext::new(identity);
        let span = ctx.logger().span();

        async move {
            ctx.logger().info(LogStage::JobStart, &format!("Job started: {}", ctx.identity()));
            if let Some(expected) = &self.expected_bucket {
                if expected != &ctx.identity().source_bucket {
                    ctx.logger().warn(
                        LogStage::JobStart,
                        &format!("Source bucket differs from {}", expected),
                    );
                }
            }

            let outcome = match self.process(&mut ctx).await {
                Ok(done) => done,
                Err(failed) => failed,
            };

            ctx.transition(JobState::Reporting);
            let report = self.collaborators.reporter.report(ctx.identity(), &outcome).await;

            let final_state = if outcome.is_done() {
                JobState::Done
            } else {
                JobState::Failed
            };
            ctx.transition(final_state);

            match &outcome {
                Outcome::Done { .. } => ctx
                    .logger()
                    .info(LogStage::JobDone, &format!("Job finished in {} ms", ctx.elapsed_ms())),
                Outcome::Failed {
                    error_kind,
                    error_message,
                } => ctx.logger().error(
                    LogStage::JobFailed,
                    &format!("Job failed with {}: {}", error_kind, error_message),
                ),
            }
            metrics::record_job(
                outcome.status(),
                outcome.error_kind(),
                ctx.elapsed_ms() as f64 / 1000.0,
            );

            let scratch_dir = self.collaborators.object_store.scratch_dir(&ctx.identity().job_id);
            cleanup(&ctx, &scratch_dir).await;

            RunSummary {
                outcome,
                final_state: ctx.state(),
                report,
            }
        }
        .instrument(span)
        .await
    }

    /// Report a work item that could not be parsed into a job.
    ///
    /// No stage runs. Without an addressable identity nothing can be sent,
    /// and the report counts as undelivered.
    pub async fn reject(&self, error: &IntakeError) -> RunSummary {
        let outcome = Outcome::failed(ErrorKind::MalformedInput, error.message.clone());

        let report = match &error.identity {
            Some(identity) => {
                warn!(job_id = %identity.job_id, "Reporting malformed work item: {}", error.message);
                self.collaborators.reporter.report(identity, &outcome).await
            }
            None => {
                warn!("Malformed work item cannot be addressed to a job: {}", error.message);
                ReportResult::undelivered(0, None)
            }
        };
        metrics::record_job(outcome.status(), outcome.error_kind(), 0.0);

        RunSummary {
            outcome,
            final_state: JobState::Failed,
            report,
        }
    }

    /// Working stages. `Err` carries the `Failed` outcome of the first stage
    /// that gave up.
    async fn process(&self, ctx: &mut JobContext) -> Result<Outcome, Outcome> {
        let c = &self.collaborators;
        let identity = ctx.identity().clone();

        // Download
        ctx.transition(JobState::Downloading);
        ctx.logger().info(LogStage::DownloadStart, &format!("Downloading {}", identity.source_key));
        let store = c.object_store.as_ref();
        let (job_id, bucket, key) = (
            identity.job_id.as_str(),
            identity.source_bucket.as_str(),
            identity.source_key.as_str(),
        );
        let video = StageExecutor::run(StageName::Download, &self.policies.download, move |_| {
            store.download(job_id, bucket, key)
        })
        .await;
        let video = stage_value(ctx, StageName::Download, video)?;
        ctx.record(StageName::Download, ArtifactRef::LocalFile(video.clone()));
        ctx.logger().info(LogStage::DownloadDone, &format!("Downloaded to {}", video.display()));

        // Extraction
        ctx.transition(JobState::Extracting);
        ctx.logger().info(LogStage::FfmpegStart, "Extracting audio");
        let transcoder = c.transcoder.as_ref();
        let video_path: &Path = &video;
        let audio = StageExecutor::run(StageName::Extraction, &self.policies.extraction, move |strategy| {
            transcoder.extract_audio(video_path, strategy)
        })
        .await;
        let audio = stage_value(ctx, StageName::Extraction, audio)?;
        ctx.record(StageName::Extraction, ArtifactRef::LocalFile(audio.clone()));
        ctx.logger().info(LogStage::FfmpegDone, &format!("Audio at {}", audio.display()));

        // Transcription
        ctx.transition(JobState::Transcribing);
        ctx.logger().info(LogStage::SttStart, "Transcribing audio");
        let transcriber = c.transcriber.as_ref();
        let audio_path: &Path = &audio;
        let transcript = StageExecutor::run(StageName::Transcription, &self.policies.transcription, move |_| {
            async move {
                let text = transcriber.transcribe(audio_path).await?;
                validate_transcript(&text).map_err(|e| StageError::from(e).permanent())?;
                Ok::<_, StageError>(text)
            }
        })
        .await;
        let transcript = stage_value(ctx, StageName::Transcription, transcript)?;
        ctx.record(StageName::Transcription, ArtifactRef::Text(transcript.clone()));
        ctx.logger().info(
            LogStage::SttDone,
            &format!("Transcript of {} chars", transcript.chars().count()),
        );

        // Summarization
        ctx.transition(JobState::Summarizing);
        let summary_input = truncate_transcript(&transcript, MAX_SUMMARY_INPUT_CHARS);
        ctx.logger().info(
            LogStage::LlmStart,
            &format!("Summarizing {} chars", summary_input.chars().count()),
        );
        let summarizer = c.summarizer.as_ref();
        let input: &str = &summary_input;
        let summary = StageExecutor::run(StageName::Summarization, &self.policies.summarization, move |_| {
            summarizer.summarize(input)
        })
        .await;
        let summary = stage_value(ctx, StageName::Summarization, summary)?;
        ctx.record(StageName::Summarization, ArtifactRef::Text(summary.clone()));
        ctx.logger().info(LogStage::LlmDone, &format!("Summary of {} chars", summary.chars().count()));

        let meta = ProcessingMeta {
            duration_ms: None,
            model: c.summarizer.model().to_string(),
            stt_engine: c.transcriber.engine().to_string(),
        };

        // Upload (optional, best effort)
        let result_reference = match &c.result_store {
            Some(result_store) => {
                ctx.transition(JobState::Uploading);
                self.upload(ctx, result_store.as_ref(), &transcript, &summary, &meta).await
            }
            None => None,
        };

        Ok(Outcome::Done {
            transcript,
            summary,
            result_reference,
            meta: ProcessingMeta {
                duration_ms: Some(ctx.elapsed_ms()),
                ..meta
            },
        })
    }

    /// Upload the result document. Failures are logged and swallowed.
    async fn upload(
        &self,
        ctx: &mut JobContext,
        result_store: &dyn ResultStore,
        transcript: &str,
        summary: &str,
        meta: &ProcessingMeta,
    ) -> Option<String> {
        let document = ResultDocument::new(ctx.identity(), transcript, summary, meta, Utc::now());
        let body = match document.to_json_bytes() {
            Ok(body) => body,
            Err(e) => {
                ctx.logger().warn(LogStage::UploadDone, &format!("Result not serialized: {}", e));
                return None;
            }
        };

        let key = result_key(&ctx.identity().source_key);
        let object_key: &str = &key;
        let uploaded = StageExecutor::run(StageName::Upload, &self.policies.upload, move |_| {
            result_store.upload(object_key, body.clone())
        })
        .await;

        match uploaded {
            StageResult::Success(reference) => {
                ctx.record(StageName::Upload, ArtifactRef::ObjectKey(reference.clone()));
                ctx.logger().info(LogStage::UploadDone, &format!("Result stored at {}", reference));
                Some(reference)
            }
            StageResult::Failure { message, .. } => {
                ctx.logger().warn(
                    LogStage::UploadDone,
                    &format!("Result upload failed, continuing without it: {}", message),
                );
                None
            }
        }
    }
}

/// Unwrap a stage result, logging the failure that ends the run.
fn stage_value<T>(ctx: &JobContext, stage: StageName, result: StageResult<T>) -> Result<T, Outcome> {
    if let StageResult::Failure { kind, message } = &result {
        warn!(
            job_id = %ctx.identity().job_id,
            stage = %stage,
            error_kind = %kind,
            "Stage gave up: {}", message
        );
    }
    result.into_result()
}

/// Remove recorded artifacts, then the scratch directory with whatever a
/// failed stage left in it.
async fn cleanup(ctx: &JobContext, scratch_dir: &Path) {
    let removed = remove_files(ctx.local_files()).await;

    // An empty job id would name the work dir itself
    let scratch_removed = !ctx.identity().job_id.is_empty() && remove_scratch_dir(scratch_dir).await;
    tracing::debug!(
        job_id = %ctx.identity().job_id,
        removed,
        scratch_removed,
        "Cleaned up local artifacts"
    );
}

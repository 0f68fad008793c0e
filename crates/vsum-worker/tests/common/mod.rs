//! Scripted collaborators for orchestrator and message loop tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use vsum_media::AudioFilterStrategy;
use vsum_models::{JobIdentity, Outcome, ReportResult};
use vsum_queue::{QueueError, QueueResult, WorkItem, WorkItemSource};
use vsum_worker::{
    Collaborators, JobOrchestrator, MediaTranscoder, ObjectStore, Reporter, ResultStore,
    StageConfig, StageError, StagePolicies, Summarizer, Transcriber,
};

pub const TRANSCRIPT: &str = "오늘은 회의 내용을 정리합니다. 다음 분기 목표를 공유합니다.";
pub const SUMMARY: &str = "다음 분기 목표 공유 회의";

/// Responses handed out in order; the last one repeats once the script
/// runs out.
pub struct Script<T: Clone> {
    responses: Mutex<VecDeque<Result<T, StageError>>>,
    last: Mutex<Option<Result<T, StageError>>>,
    calls: AtomicU32,
}

impl<T: Clone> Script<T> {
    pub fn new(responses: Vec<Result<T, StageError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always(response: Result<T, StageError>) -> Self {
        Self::new(vec![response])
    }

    pub fn next(&self) -> Result<T, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = responses.pop_front() {
            *last = Some(response.clone());
            return response;
        }
        last.clone().expect("script has no responses")
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Writes the video file before consulting the script, so a failed
/// download leaves it behind the way a rejected empty download does.
pub struct FakeObjectStore {
    pub dir: TempDir,
    pub script: Script<()>,
}

impl FakeObjectStore {
    pub fn new(script: Script<()>) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            script,
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn download(&self, job_id: &str, _bucket: &str, key: &str) -> Result<PathBuf, StageError> {
        let file = key.rsplit('/').next().unwrap_or(key);
        let path = self.scratch_dir(job_id).join(file);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"video").await.unwrap();
        self.script.next()?;
        Ok(path)
    }

    fn scratch_dir(&self, job_id: &str) -> PathBuf {
        self.dir.path().join(job_id)
    }
}

pub struct FakeTranscoder {
    pub script: Script<()>,
    pub strategies: Mutex<Vec<AudioFilterStrategy>>,
}

impl FakeTranscoder {
    pub fn new(script: Script<()>) -> Self {
        Self {
            script,
            strategies: Mutex::new(Vec::new()),
        }
    }

    pub fn strategies(&self) -> Vec<AudioFilterStrategy> {
        self.strategies.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTranscoder for FakeTranscoder {
    async fn extract_audio(
        &self,
        video: &Path,
        strategy: AudioFilterStrategy,
    ) -> Result<PathBuf, StageError> {
        self.strategies.lock().unwrap().push(strategy);
        // Written even when the script fails, like a WAV that fails validation
        let output = video.with_extension("wav");
        tokio::fs::write(&output, b"RIFF....WAVE").await.unwrap();
        self.script.next()?;
        Ok(output)
    }
}

pub struct FakeTranscriber {
    pub script: Script<String>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String, StageError> {
        self.script.next()
    }

    fn engine(&self) -> &str {
        "clova"
    }
}

pub struct FakeSummarizer {
    pub script: Script<String>,
    pub inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, StageError> {
        self.inputs.lock().unwrap().push(text.to_string());
        self.script.next()
    }

    fn model(&self) -> &str {
        "claude-3-7-sonnet-latest"
    }
}

pub struct FakeResultStore {
    pub script: Script<()>,
    pub uploads: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl ResultStore for FakeResultStore {
    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<String, StageError> {
        self.script.next()?;
        let document = serde_json::from_slice(&body).unwrap();
        self.uploads.lock().unwrap().push((key.to_string(), document));
        Ok(key.to_string())
    }
}

pub struct FakeReporter {
    results: Mutex<VecDeque<ReportResult>>,
    pub reports: Mutex<Vec<(JobIdentity, Outcome)>>,
}

impl FakeReporter {
    pub fn delivering() -> Self {
        Self::new(vec![])
    }

    /// Results handed out in order; delivered on the first attempt afterwards.
    pub fn new(results: Vec<ReportResult>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<(JobIdentity, Outcome)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for FakeReporter {
    async fn report(&self, identity: &JobIdentity, outcome: &Outcome) -> ReportResult {
        self.reports
            .lock()
            .unwrap()
            .push((identity.clone(), outcome.clone()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ReportResult::delivered(1, 200))
    }
}

/// All collaborators, each scripted to succeed unless replaced.
pub struct Harness {
    pub object_store: Arc<FakeObjectStore>,
    pub transcoder: Arc<FakeTranscoder>,
    pub transcriber: Arc<FakeTranscriber>,
    pub summarizer: Arc<FakeSummarizer>,
    pub result_store: Option<Arc<FakeResultStore>>,
    pub reporter: Arc<FakeReporter>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            object_store: Arc::new(FakeObjectStore::new(Script::always(Ok(())))),
            transcoder: Arc::new(FakeTranscoder::new(Script::always(Ok(())))),
            transcriber: Arc::new(FakeTranscriber {
                script: Script::always(Ok(TRANSCRIPT.to_string())),
            }),
            summarizer: Arc::new(FakeSummarizer {
                script: Script::always(Ok(SUMMARY.to_string())),
                inputs: Mutex::new(Vec::new()),
            }),
            result_store: Some(Arc::new(FakeResultStore {
                script: Script::always(Ok(())),
                uploads: Mutex::new(Vec::new()),
            })),
            reporter: Arc::new(FakeReporter::delivering()),
        }
    }
}

impl Harness {
    pub fn orchestrator(&self) -> JobOrchestrator {
        let collaborators = Collaborators {
            object_store: self.object_store.clone(),
            transcoder: self.transcoder.clone(),
            transcriber: self.transcriber.clone(),
            summarizer: self.summarizer.clone(),
            result_store: self
                .result_store
                .clone()
                .map(|store| store as Arc<dyn ResultStore>),
            reporter: self.reporter.clone(),
        };
        JobOrchestrator::new(collaborators, fast_policies())
    }

    pub fn uploads(&self) -> usize {
        self.result_store
            .as_ref()
            .map(|s| s.uploads.lock().unwrap().len())
            .unwrap_or(0)
    }
}

pub fn fast_policies() -> StagePolicies {
    StagePolicies::from_config(&StageConfig {
        max_attempts: 3,
        retry_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
    })
}

pub fn identity() -> JobIdentity {
    JobIdentity {
        job_id: "987654321".into(),
        user_id: Some("123".into()),
        source_bucket: "shortform-video-bucket".into(),
        source_key: "videos/123/987654321.mp4".into(),
    }
}

pub fn s3_event(bucket: &str, key: &str) -> String {
    json!({
        "Records": [{
            "eventTime": "2025-01-15T10:30:00.000Z",
            "s3": {
                "bucket": {"name": bucket},
                "object": {"key": key, "size": 1024}
            }
        }]
    })
    .to_string()
}

/// In-memory queue recording acknowledgements.
#[derive(Default)]
pub struct FakeSource {
    items: Mutex<VecDeque<WorkItem>>,
    acked: Mutex<Vec<String>>,
    fail_receive: AtomicBool,
    no_redrive: AtomicBool,
}

impl FakeSource {
    pub fn with_items(items: Vec<WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
            ..Self::default()
        }
    }

    pub fn push(&self, item: WorkItem) {
        self.items.lock().unwrap().push_back(item);
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn fail_receives(&self) {
        self.fail_receive.store(true, Ordering::SeqCst);
    }

    /// Behave like a backend with no dead-letter queue.
    pub fn without_redrive(self) -> Self {
        self.no_redrive.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl WorkItemSource for FakeSource {
    async fn receive(&self, wait: Duration) -> QueueResult<Option<WorkItem>> {
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(QueueError::receive_failed("connection reset"));
        }
        let next = self.items.lock().unwrap().pop_front();
        if next.is_none() {
            // Long poll
            tokio::time::sleep(wait).await;
        }
        Ok(next)
    }

    async fn acknowledge(&self, item: &WorkItem) -> QueueResult<()> {
        self.acked.lock().unwrap().push(item.message_id.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "fake"
    }

    fn redrives_poison_items(&self) -> bool {
        !self.no_redrive.load(Ordering::SeqCst)
    }
}

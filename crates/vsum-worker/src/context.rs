//! Per-run job state.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::warn;
use vsum_models::{ArtifactRef, JobIdentity, JobState, StageName};

use crate::logging::JobLogger;

/// State of one orchestration run.
///
/// Created when a work item is received and dropped after reporting. A
/// redelivered item gets a fresh context; nothing carries over.
#[derive(Debug)]
pub struct JobContext {
    identity: JobIdentity,
    state: JobState,
    stage_outputs: BTreeMap<StageName, ArtifactRef>,
    started_at: Instant,
    logger: JobLogger,
}

impl JobContext {
    pub fn new(identity: JobIdentity) -> Self {
        let logger = JobLogger::new(&identity);
        Self {
            identity,
            state: JobState::Received,
            stage_outputs: BTreeMap::new(),
            started_at: Instant::now(),
            logger,
        }
    }

    pub fn identity(&self) -> &JobIdentity {
        &self.identity
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    /// Move to `next`. Terminal states are final and states only move
    /// forward; a rejected transition leaves the state unchanged.
    pub fn transition(&mut self, next: JobState) -> bool {
        if self.state.is_terminal() || rank(next) <= rank(self.state) {
            warn!(
                job_id = %self.identity.job_id,
                from = %self.state,
                to = %next,
                "Rejected job state transition"
            );
            return false;
        }
        self.state = next;
        true
    }

    pub fn record(&mut self, stage: StageName, artifact: ArtifactRef) {
        self.stage_outputs.insert(stage, artifact);
    }

    pub fn output(&self, stage: StageName) -> Option<&ArtifactRef> {
        self.stage_outputs.get(&stage)
    }

    /// Local files produced so far, for cleanup.
    pub fn local_files(&self) -> Vec<PathBuf> {
        self.stage_outputs
            .values()
            .filter_map(|a| a.as_path().map(|p| p.to_path_buf()))
            .collect()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}

fn rank(state: JobState) -> u8 {
    match state {
        JobState::Received => 0,
        JobState::Downloading => 1,
        JobState::Extracting => 2,
        JobState::Transcribing => 3,
        JobState::Summarizing => 4,
        JobState::Uploading => 5,
        JobState::Reporting => 6,
        JobState::Done | JobState::Failed => 7,
    }
}

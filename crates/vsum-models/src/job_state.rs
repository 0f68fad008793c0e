//! Job lifecycle states and stage names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named step in the fixed processing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Parsing the inbound work item into a job identity
    Intake,
    Download,
    Extraction,
    Transcription,
    Summarization,
    Upload,
    Reporting,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Intake => "intake",
            StageName::Download => "download",
            StageName::Extraction => "extraction",
            StageName::Transcription => "transcription",
            StageName::Summarization => "summarization",
            StageName::Upload => "upload",
            StageName::Reporting => "reporting",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestration state of a single job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    #[default]
    Received,
    Downloading,
    Extracting,
    Transcribing,
    Summarizing,
    Uploading,
    Reporting,
    Done,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Received => "RECEIVED",
            JobState::Downloading => "DOWNLOADING",
            JobState::Extracting => "EXTRACTING",
            JobState::Transcribing => "TRANSCRIBING",
            JobState::Summarizing => "SUMMARIZING",
            JobState::Uploading => "UPLOADING",
            JobState::Reporting => "REPORTING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
        }
    }

    /// Check if this is a terminal state (no more transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// The stage executed while in this state, if any.
    pub fn stage(&self) -> Option<StageName> {
        match self {
            JobState::Downloading => Some(StageName::Download),
            JobState::Extracting => Some(StageName::Extraction),
            JobState::Transcribing => Some(StageName::Transcription),
            JobState::Summarizing => Some(StageName::Summarization),
            JobState::Uploading => Some(StageName::Upload),
            JobState::Reporting => Some(StageName::Reporting),
            JobState::Received | JobState::Done | JobState::Failed => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Reporting.is_terminal());
        assert!(!JobState::Received.is_terminal());
    }

    #[test]
    fn test_state_stage_mapping() {
        assert_eq!(JobState::Transcribing.stage(), Some(StageName::Transcription));
        assert_eq!(JobState::Reporting.stage(), Some(StageName::Reporting));
        assert_eq!(JobState::Done.stage(), None);
    }
}

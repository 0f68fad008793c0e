//! Shared data models for the video summary worker.
//!
//! This crate provides Serde-serializable types for:
//! - Job identity and S3 event intake
//! - Job lifecycle states and stage names
//! - Stage results, terminal outcomes and the error taxonomy
//! - Backend callback request bodies

pub mod artifact;
pub mod callback;
pub mod error_kind;
pub mod identity;
pub mod job_state;
pub mod outcome;

// Re-export common types
pub use artifact::ArtifactRef;
pub use callback::{CallbackRequest, CallbackStatus, ReportResult};
pub use error_kind::ErrorKind;
pub use identity::{
    derive_ids_from_key, parse_work_item, Intake, IntakeError, JobIdentity, S3EventNotification,
    S3EventRecord,
};
pub use job_state::{JobState, StageName};
pub use outcome::{Outcome, ProcessingMeta, StageResult};

//! References to artifacts produced by processing stages.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a completed stage handed to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArtifactRef {
    /// A file on the worker's local disk
    LocalFile(PathBuf),
    /// Text produced by a service (transcript, summary)
    Text(String),
    /// Key of an object written to remote storage
    ObjectKey(String),
}

impl ArtifactRef {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ArtifactRef::LocalFile(p) => Some(p.as_path()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArtifactRef::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

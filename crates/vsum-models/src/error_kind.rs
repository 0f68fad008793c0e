//! Error taxonomy surfaced to the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failure kinds a job can terminate with.
///
/// This is the only failure vocabulary the backend ever sees. Collaborator
/// specific detail travels in the human-readable message instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    DownloadFailed,
    ExtractionFailed,
    TranscriptionTimeout,
    TranscriptionBadResponse,
    SummarizationTimeout,
    SummarizationBadResponse,
    CallbackFailed,
    MalformedInput,
    /// Catch-all. Seeing this in practice means the classifier has a gap.
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::DownloadFailed,
        ErrorKind::ExtractionFailed,
        ErrorKind::TranscriptionTimeout,
        ErrorKind::TranscriptionBadResponse,
        ErrorKind::SummarizationTimeout,
        ErrorKind::SummarizationBadResponse,
        ErrorKind::CallbackFailed,
        ErrorKind::MalformedInput,
        ErrorKind::Unknown,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorKind::ExtractionFailed => "EXTRACTION_FAILED",
            ErrorKind::TranscriptionTimeout => "TRANSCRIPTION_TIMEOUT",
            ErrorKind::TranscriptionBadResponse => "TRANSCRIPTION_BAD_RESPONSE",
            ErrorKind::SummarizationTimeout => "SUMMARIZATION_TIMEOUT",
            ErrorKind::SummarizationBadResponse => "SUMMARIZATION_BAD_RESPONSE",
            ErrorKind::CallbackFailed => "CALLBACK_FAILED",
            ErrorKind::MalformedInput => "MALFORMED_INPUT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_as_str() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_deserialize_wire_name() {
        let kind: ErrorKind = serde_json::from_str("\"TRANSCRIPTION_TIMEOUT\"").unwrap();
        assert_eq!(kind, ErrorKind::TranscriptionTimeout);
    }
}

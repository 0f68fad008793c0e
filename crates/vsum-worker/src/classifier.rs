//! Mapping stage failures onto the error taxonomy.

use vsum_models::{ErrorKind, StageName};

use crate::stage::{FailureSignal, StageError};

/// Classify a failure of `stage`.
///
/// The stage decides the kind; the signal only splits the two stages that
/// report timeouts separately from bad responses.
pub fn classify(stage: StageName, error: &StageError) -> ErrorKind {
    match stage {
        StageName::Intake => ErrorKind::MalformedInput,
        StageName::Download => ErrorKind::DownloadFailed,
        StageName::Extraction => ErrorKind::ExtractionFailed,
        StageName::Transcription => match error.signal {
            FailureSignal::Timeout => ErrorKind::TranscriptionTimeout,
            FailureSignal::BadResponse | FailureSignal::Other => ErrorKind::TranscriptionBadResponse,
        },
        StageName::Summarization => match error.signal {
            FailureSignal::Timeout => ErrorKind::SummarizationTimeout,
            FailureSignal::BadResponse | FailureSignal::Other => ErrorKind::SummarizationBadResponse,
        },
        StageName::Reporting => ErrorKind::CallbackFailed,
        // Upload failures never reach the backend
        StageName::Upload => ErrorKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNALS: [FailureSignal; 3] = [
        FailureSignal::Timeout,
        FailureSignal::BadResponse,
        FailureSignal::Other,
    ];

    fn err(signal: FailureSignal) -> StageError {
        StageError::new(signal, "boom")
    }

    #[test]
    fn test_single_kind_stages_ignore_signal() {
        for signal in SIGNALS {
            assert_eq!(classify(StageName::Intake, &err(signal)), ErrorKind::MalformedInput);
            assert_eq!(classify(StageName::Download, &err(signal)), ErrorKind::DownloadFailed);
            assert_eq!(classify(StageName::Extraction, &err(signal)), ErrorKind::ExtractionFailed);
            assert_eq!(classify(StageName::Reporting, &err(signal)), ErrorKind::CallbackFailed);
            assert_eq!(classify(StageName::Upload, &err(signal)), ErrorKind::Unknown);
        }
    }

    #[test]
    fn test_transcription_splits_timeout() {
        assert_eq!(
            classify(StageName::Transcription, &err(FailureSignal::Timeout)),
            ErrorKind::TranscriptionTimeout
        );
        assert_eq!(
            classify(StageName::Transcription, &err(FailureSignal::BadResponse)),
            ErrorKind::TranscriptionBadResponse
        );
        assert_eq!(
            classify(StageName::Transcription, &err(FailureSignal::Other)),
            ErrorKind::TranscriptionBadResponse
        );
    }

    #[test]
    fn test_summarization_splits_timeout() {
        assert_eq!(
            classify(StageName::Summarization, &err(FailureSignal::Timeout)),
            ErrorKind::SummarizationTimeout
        );
        assert_eq!(
            classify(StageName::Summarization, &err(FailureSignal::Other)),
            ErrorKind::SummarizationBadResponse
        );
    }

    #[test]
    fn test_retryable_flag_does_not_change_kind() {
        let permanent = StageError::timeout("t").permanent();
        assert_eq!(
            classify(StageName::Summarization, &permanent),
            ErrorKind::SummarizationTimeout
        );
    }
}

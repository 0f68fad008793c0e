//! Transcript length gate and truncation before summarization.

use crate::error::{AiError, AiResult};

/// Trimmed transcripts shorter than this carry nothing to summarize.
pub const MIN_TRANSCRIPT_CHARS: usize = 10;
/// Transcripts longer than this are rejected outright.
pub const MAX_TRANSCRIPT_CHARS: usize = 100_000;
/// Longest transcript sent to the summarizer.
pub const MAX_SUMMARY_INPUT_CHARS: usize = 50_000;

const SENTENCE_SEPARATOR: &str = ". ";

/// Reject transcripts outside the accepted length range.
pub fn validate_transcript(transcript: &str) -> AiResult<()> {
    let trimmed = transcript.trim().chars().count();
    if trimmed < MIN_TRANSCRIPT_CHARS {
        return Err(AiError::invalid_response(
            "Clova STT",
            format!("transcript too short ({} chars)", trimmed),
        ));
    }

    let total = transcript.chars().count();
    if total > MAX_TRANSCRIPT_CHARS {
        return Err(AiError::invalid_response(
            "Clova STT",
            format!("transcript too long ({} chars)", total),
        ));
    }

    Ok(())
}

/// Cut a transcript to at most `max_chars`, keeping whole sentences.
///
/// Sentences are split on `". "`; the kept prefix gets a trailing `.`. If not
/// even the first sentence fits, the first `max_chars` characters are used.
pub fn truncate_transcript(transcript: &str, max_chars: usize) -> String {
    if transcript.chars().count() <= max_chars {
        return transcript.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut length = 0;
    for sentence in transcript.split(SENTENCE_SEPARATOR) {
        let cost = sentence.chars().count() + SENTENCE_SEPARATOR.len();
        if length + cost > max_chars {
            break;
        }
        kept.push(sentence);
        length += cost;
    }

    let mut result = kept.join(SENTENCE_SEPARATOR);
    if result.is_empty() {
        return transcript.chars().take(max_chars).collect();
    }
    if !result.ends_with('.') {
        result.push('.');
    }
    result
}

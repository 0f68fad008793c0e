//! Clients for the speech-to-text and summarization services.
//!
//! Each client makes exactly one HTTP call per operation and maps the
//! response into an [`AiError`] that tells timeouts apart from bad
//! responses. Retrying is left to the caller.

pub mod claude;
pub mod clova;
pub mod error;
pub mod transcript;
pub mod types;

pub use claude::{ClaudeClient, ClaudeConfig};
pub use clova::{ClovaConfig, ClovaSttClient, STT_ENGINE};
pub use error::{AiError, AiResult};
pub use transcript::{
    truncate_transcript, validate_transcript, MAX_SUMMARY_INPUT_CHARS, MAX_TRANSCRIPT_CHARS,
    MIN_TRANSCRIPT_CHARS,
};

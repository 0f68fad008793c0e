//! FFmpeg CLI wrapper for audio extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Timeout-bounded FFmpeg execution via tokio
//! - Speech-oriented audio extraction with denoiser strategies
//! - Local file naming and cleanup helpers

pub mod audio;
pub mod command;
pub mod error;
pub mod fs_utils;

pub use audio::{extract_audio, validate_wav, AudioFilterStrategy};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{
    is_supported_video, remove_files, remove_scratch_dir, safe_file_stem, video_output_path, SUPPORTED_VIDEO_EXTENSIONS,
};

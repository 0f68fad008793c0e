//! Speech audio extraction.
//!
//! Produces the mono 16 kHz PCM s16le WAV the speech-to-text service expects.
//! Band-limiting to the voice range (200 Hz – 3.8 kHz) runs before the
//! denoiser. Not every ffmpeg build ships every denoiser, so extraction is
//! tried with a chain of strategies, each one less demanding than the last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

pub const SAMPLE_RATE_HZ: u32 = 16_000;
pub const CHANNELS: u8 = 1;
pub const AUDIO_CODEC: &str = "pcm_s16le";

/// Extracted audio smaller than this is treated as empty.
pub const MIN_AUDIO_BYTES: u64 = 1024;
/// Upper bound accepted by the speech-to-text service.
pub const MAX_AUDIO_BYTES: u64 = 100 * 1024 * 1024;

const VOICE_BAND: &str = "highpass=f=200,lowpass=f=3800";

/// Audio filter chain used for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFilterStrategy {
    /// Voice band + FFT denoiser
    Afftdn,
    /// Voice band + non-local-means denoiser
    Anlmdn,
    /// Format conversion only
    Plain,
}

impl AudioFilterStrategy {
    /// Primary strategy followed by its fallbacks, in order.
    pub const CHAIN: [AudioFilterStrategy; 3] = [
        AudioFilterStrategy::Afftdn,
        AudioFilterStrategy::Anlmdn,
        AudioFilterStrategy::Plain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFilterStrategy::Afftdn => "afftdn",
            AudioFilterStrategy::Anlmdn => "anlmdn",
            AudioFilterStrategy::Plain => "plain",
        }
    }

    /// The `-af` filter graph, if any.
    pub fn filter_chain(&self) -> Option<String> {
        match self {
            AudioFilterStrategy::Afftdn => Some(format!("{},afftdn", VOICE_BAND)),
            AudioFilterStrategy::Anlmdn => Some(format!("{},anlmdn", VOICE_BAND)),
            AudioFilterStrategy::Plain => None,
        }
    }

    /// Build the ffmpeg command for this strategy.
    pub fn command(&self, video: &Path, output: &Path) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(video, output).no_video();
        if let Some(filter) = self.filter_chain() {
            cmd = cmd.audio_filter(filter);
        }
        cmd.audio_codec(AUDIO_CODEC)
            .audio_channels(CHANNELS)
            .sample_rate(SAMPLE_RATE_HZ)
    }
}

impl fmt::Display for AudioFilterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract speech audio from `video` into `output` with one strategy.
///
/// The output is validated as a WAV file before returning.
pub async fn extract_audio(
    video: &Path,
    output: &Path,
    strategy: AudioFilterStrategy,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let cmd = strategy.command(video, output);
    runner.run(&cmd).await?;

    let size = validate_wav(output).await?;
    info!(
        strategy = strategy.as_str(),
        output = %output.display(),
        file_size = size,
        "Audio extracted"
    );

    Ok(output.to_path_buf())
}

/// Check that `path` is a plausibly sized RIFF/WAVE file; returns its size.
pub async fn validate_wav(path: &Path) -> MediaResult<u64> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::invalid_audio(format!(
                "output file not found: {}",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let size = metadata.len();
    if size < MIN_AUDIO_BYTES {
        return Err(MediaError::invalid_audio(format!("audio too small: {} bytes", size)));
    }
    if size > MAX_AUDIO_BYTES {
        return Err(MediaError::invalid_audio(format!("audio too large: {} bytes", size)));
    }

    let mut header = [0u8; 12];
    let mut file = tokio::fs::File::open(path).await?;
    file.read_exact(&mut header).await?;

    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(MediaError::invalid_audio("missing RIFF/WAVE header"));
    }

    Ok(size)
}

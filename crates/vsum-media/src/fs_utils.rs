//! Local file naming and cleanup for downloaded media.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

/// Container extensions ffmpeg can demux that we accept as video uploads.
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "qt", // MPEG-4, QuickTime
    "avi", "divx", // AVI
    "mkv", "webm", // Matroska, WebM
    "flv", "f4v", // Flash
    "wmv", "asf", // Windows Media
    "mpg", "mpeg", "m2v", // MPEG
    "3gp", "3g2", // 3GPP
    "ts", "mts", "m2ts", // transport streams
    "vob", // DVD
    "ogv", "ogg", // Ogg
];

/// Longest file stem kept from an object key.
pub const MAX_STEM_CHARS: usize = 200;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-.]").unwrap());

/// Lowercased extension of the last path segment of `key`, without the dot.
pub fn extension_of(key: &str) -> Option<String> {
    Path::new(file_name_of(key))
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Whether `key` names a video container we can extract audio from.
pub fn is_supported_video(key: &str) -> bool {
    extension_of(key)
        .map(|ext| SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Filesystem-safe stem derived from the last segment of an object key.
pub fn safe_file_stem(key: &str) -> String {
    let name = file_name_of(key);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let truncated: String = stem.chars().take(MAX_STEM_CHARS).collect();
    let safe = UNSAFE_FILENAME_CHARS.replace_all(&truncated, "_").into_owned();
    if safe.is_empty() {
        "input".to_string()
    } else {
        safe
    }
}

/// Where the downloaded video for a job is stored.
///
/// Each job gets its own directory so concurrent loops never share files.
pub fn video_output_path(work_dir: &Path, job_id: &str, key: &str) -> PathBuf {
    let file = match extension_of(key) {
        Some(ext) => format!("{}.{}", safe_file_stem(key), ext),
        None => safe_file_stem(key),
    };
    work_dir.join(job_id).join(file)
}

/// Remove local files, best effort. Returns how many were removed.
pub async fn remove_files<I, P>(paths: I) -> usize
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut removed = 0;
    for path in paths {
        let path = path.as_ref();
        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!("Removed temp file: {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("Failed to remove temp file {}: {}", path.display(), e);
            }
        }
    }
    removed
}

/// Remove a job's scratch directory with everything left in it, best effort.
/// Returns whether anything was removed.
pub async fn remove_scratch_dir(dir: &Path) -> bool {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::debug!("Removed scratch dir: {}", dir.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!("Failed to remove scratch dir {}: {}", dir.display(), e);
            false
        }
    }
}

fn file_name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

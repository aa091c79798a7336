//! Locating the ffmpeg binary used to decode non-WAV tracks.

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Well-known install locations, checked before falling back to `PATH`.
fn candidate_paths() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/usr/bin/ffmpeg"]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };
    paths.iter().map(PathBuf::from).collect()
}

/// Finds ffmpeg in a standard location or on `PATH`.
///
/// # Errors
/// - If ffmpeg is not installed
pub fn find_ffmpeg() -> Result<PathBuf> {
    if let Some(path) = candidate_paths().into_iter().find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", path.display());
        return Ok(path);
    }

    let search_cmd = if cfg!(target_os = "windows") { "where" } else { "which" };
    let output = std::process::Command::new(search_cmd)
        .arg("ffmpeg")
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for ffmpeg: {e}"))?;

    let found = String::from_utf8_lossy(&output.stdout);
    let path = PathBuf::from(found.lines().next().unwrap_or("").trim());
    if output.status.success() && !path.as_os_str().is_empty() {
        tracing::debug!("Found ffmpeg in PATH at: {}", path.display());
        return Ok(path);
    }

    Err(anyhow!(
        "ffmpeg is required to play non-WAV files. Install it or convert the track to WAV:\n\
         macOS: brew install ffmpeg\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)"
    ))
}

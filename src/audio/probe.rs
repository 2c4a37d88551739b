use serde_json::Value;
use std::path::Path;
use tokio::process::Command;

use crate::{Result, SoundclipError};

/// What ffprobe reports about a media file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaProbe {
    pub duration_seconds: Option<f64>,
    pub has_audio: bool,
}

/// Get file information using ffprobe
pub async fn probe_media(ffprobe: &Path, media: &Path) -> Result<MediaProbe> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(media)
        .output()
        .await
        .map_err(|e| {
            SoundclipError::Encoding(format!(
                "could not run {} ({}). Is ffmpeg installed?",
                ffprobe.display(),
                e
            ))
        })?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(SoundclipError::Encoding(format!(
            "Failed to analyze {} with ffprobe: {}",
            media.display(),
            error.trim()
        )));
    }

    let info: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| SoundclipError::Encoding(format!("ffprobe returned malformed JSON: {}", e)))?;

    Ok(parse_probe(&info))
}

/// Extract duration and audio presence from ffprobe's JSON
pub fn parse_probe(info: &Value) -> MediaProbe {
    // ffprobe reports durations as strings
    let duration_seconds = info["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| info["format"]["duration"].as_f64());

    let has_audio = info["streams"]
        .as_array()
        .map(|streams| {
            streams
                .iter()
                .any(|stream| stream["codec_type"].as_str() == Some("audio"))
        })
        .unwrap_or(false);

    MediaProbe {
        duration_seconds,
        has_audio,
    }
}

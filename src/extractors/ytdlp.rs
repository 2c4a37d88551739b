use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{Candidate, RawMedia};
use crate::{Result, SoundclipError};

/// Thin wrapper around the yt-dlp binary shared by the remote adapters
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

/// How a platform names its content in user-facing messages
#[derive(Debug, Clone, Copy)]
pub struct ContentLabel {
    pub platform: &'static str,
    pub noun: &'static str,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, ffmpeg_location: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ffmpeg_location,
        }
    }

    /// Dump the metadata JSON for a URL without downloading anything
    pub async fn dump_info(&self, url: &str, allow_playlist: bool, label: ContentLabel) -> Result<Value> {
        tracing::debug!("Extracting {} info for: {}", label.platform, url);

        let mut command = Command::new(&self.binary);
        command.args(["--dump-single-json", "--no-warnings", "--skip-download"]);
        if !allow_playlist {
            command.arg("--no-playlist");
        }
        command.arg(url);

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| missing_binary(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, label));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            SoundclipError::Encoding(format!("yt-dlp returned malformed metadata: {}", e))
        })
    }

    /// Download the audio track as MP3 into `work_dir/<stem>.mp3`
    pub async fn download_audio(
        &self,
        url: &str,
        playlist_item: Option<u32>,
        work_dir: &Path,
        stem: &str,
        label: ContentLabel,
    ) -> Result<PathBuf> {
        let template = work_dir.join(format!("{}.%(ext)s", stem));
        let expected = work_dir.join(format!("{}.mp3", stem));

        if expected.exists() {
            tracing::info!("Reusing earlier download {}", expected.display());
            return Ok(expected);
        }

        tracing::debug!("Downloading audio for {} into {}", url, expected.display());

        let mut command = Command::new(&self.binary);
        command.args([
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
            "--no-warnings",
            "--output",
        ]);
        command.arg(&template);

        match playlist_item {
            Some(item) => {
                command.args(["--playlist-items", &item.to_string()]);
            }
            None => {
                command.arg("--no-playlist");
            }
        }

        if let Some(location) = &self.ffmpeg_location {
            command.arg("--ffmpeg-location").arg(location);
        }
        command.arg(url);

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| missing_binary(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, label));
        }

        if !expected.exists() {
            return Err(SoundclipError::Encoding(format!(
                "yt-dlp finished but {} was not created",
                expected.display()
            )));
        }

        Ok(expected)
    }
}

fn missing_binary(binary: &Path, error: std::io::Error) -> SoundclipError {
    SoundclipError::Encoding(format!(
        "could not run {} ({}). Please install yt-dlp: https://github.com/yt-dlp/yt-dlp",
        binary.display(),
        error
    ))
}

/// Map yt-dlp's error output onto the failure taxonomy
pub fn classify_failure(stderr: &str, label: ContentLabel) -> SoundclipError {
    let lower = stderr.to_lowercase();
    let detail = stderr.trim();

    if lower.contains("private") || lower.contains("login") || lower.contains("sign in") {
        SoundclipError::PrivateContent(format!(
            "This {} is private. Please try a public {}.",
            label.noun, label.noun
        ))
    } else if lower.contains("rate limit")
        || lower.contains("rate-limit")
        || lower.contains("too many")
        || lower.contains("429")
    {
        SoundclipError::RateLimited {
            message: format!(
                "{} rate limit reached. Please try again in a few minutes.",
                label.platform
            ),
            retry_after: None,
        }
    } else if lower.contains("not found") || lower.contains("404") || lower.contains("unavailable") {
        SoundclipError::NotFound(format!(
            "{} {} not found. Please check the URL.",
            label.platform, label.noun
        ))
    } else if lower.contains("timed out") || lower.contains("connection") || lower.contains("http error 5") {
        SoundclipError::Transient(format!("could not reach {}: {}", label.platform, detail))
    } else {
        SoundclipError::Encoding(format!("yt-dlp failed: {}", detail))
    }
}

/// Whether a yt-dlp entry has an audio track.
///
/// Entries with a format list need at least one format whose `acodec` is not
/// `none`; entries that only expose a direct `url` are assumed to carry sound;
/// anything else (images) has none.
pub fn entry_has_audio(entry: &Value) -> bool {
    match entry["formats"].as_array() {
        Some(formats) if !formats.is_empty() => formats.iter().any(|format| {
            format["acodec"]
                .as_str()
                .map(|codec| !codec.is_empty() && codec != "none")
                .unwrap_or(false)
        }),
        _ => entry["url"].is_string(),
    }
}

/// Build a candidate from one yt-dlp entry
pub fn entry_to_candidate(entry: &Value, ordinal: u32, url: &str, playlist_item: Option<u32>) -> Candidate {
    let has_audio = entry_has_audio(entry);

    Candidate {
        ordinal,
        has_audio,
        duration_seconds: if has_audio {
            entry["duration"].as_f64().unwrap_or(0.0)
        } else {
            0.0
        },
        thumbnail: entry["thumbnail"].as_str().map(str::to_string),
        title: entry["title"].as_str().map(str::to_string),
        raw: RawMedia::Remote {
            url: url.to_string(),
            playlist_item,
        },
    }
}

/// Candidate for a source that is one video rather than a post.
///
/// Metadata with neither a format list nor a direct url still describes a
/// playable video; only an explicit format list can mark it silent.
pub fn single_candidate(info: &Value, url: &str) -> Candidate {
    let mut candidate = entry_to_candidate(info, 1, url, None);
    if info["formats"].is_null() && info["url"].is_null() {
        candidate.has_audio = true;
        candidate.duration_seconds = info["duration"].as_f64().unwrap_or(0.0);
    }
    candidate
}

/// Turn a possibly-playlist info document into candidates in source order.
///
/// Null entries stay in the result as silent slides so ordinals keep matching
/// the slide numbers in the post.
pub fn info_to_candidates(info: &Value, url: &str) -> Vec<Candidate> {
    match info["entries"].as_array() {
        Some(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let ordinal = entry["playlist_index"]
                    .as_u64()
                    .map(|n| n as u32)
                    .unwrap_or(index as u32 + 1);
                entry_to_candidate(entry, ordinal, url, Some(ordinal))
            })
            .collect(),
        None => vec![entry_to_candidate(info, 1, url, None)],
    }
}

/// Filesystem-safe stem for a downloaded candidate.
///
/// Derived from the URL and playlist item, so the same slide of the same post
/// always lands on the same file and a kept download can be reused.
pub fn download_stem(platform: &str, candidate: &Candidate) -> String {
    let key = match &candidate.raw {
        RawMedia::Remote {
            url,
            playlist_item: Some(item),
        } => format!("{}#{}", url, item),
        RawMedia::Remote { url, playlist_item: None } => url.clone(),
        RawMedia::File { path } => path.display().to_string(),
    };
    let digest = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, key.as_bytes())
        .simple()
        .to_string();

    format!("{}_{}_{}", platform, candidate.ordinal, &digest[..12])
}

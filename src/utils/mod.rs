use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::config::ToolsConfig;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format; sub-minute values keep one decimal
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.1}s", seconds)
    }
}

/// Check that the configured external tools can be launched
pub async fn check_dependencies(tools: &ToolsConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&tools.yt_dlp, "--version").await {
        missing.push("yt-dlp - required for YouTube, Instagram and Facebook sources".to_string());
    }

    if !check_command_available(&tools.ffmpeg, "-version").await {
        missing.push("ffmpeg - required to trim and encode clips".to_string());
    }

    if !check_command_available(&tools.ffprobe, "-version").await {
        missing.push("ffprobe - required to inspect media durations".to_string());
    }

    missing
}

/// Check if a command can be run
async fn check_command_available(command: &Path, version_flag: &str) -> bool {
    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Spinner for a long-running step; hidden when `quiet`
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.set_message(message.into());
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

/// Stream a remote file to `path`, returning the number of bytes written
pub async fn download_to_file(client: &reqwest::Client, url: &str, path: &Path) -> Result<u64> {
    use futures_util::StreamExt;
    use std::io::Write;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download {}: HTTP {}", url, response.status());
    }

    let mut file = fs_err::File::create(path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
    }

    tracing::debug!("Downloaded {} to {}", format_file_size(downloaded), path.display());
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(524288), "512.0 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(4.5), "4.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[tokio::test]
    async fn test_check_dependencies_reports_missing() {
        let tools = ToolsConfig {
            yt_dlp: "/nonexistent/yt-dlp".into(),
            ffmpeg: "/nonexistent/ffmpeg".into(),
            ffprobe: "/nonexistent/ffprobe".into(),
        };
        assert_eq!(check_dependencies(&tools).await.len(), 3);
    }

    #[test]
    fn test_quiet_spinner_is_hidden() {
        assert!(spinner("working", true).is_hidden());
    }
}

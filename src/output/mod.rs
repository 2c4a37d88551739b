use anyhow::Result;
use console::style;
use serde_json::json;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::extractors::MediaSource;
use crate::pipeline::{PreparedClip, SkippedSound};
use crate::soundboard::client::{BotUser, GuildSummary};
use crate::soundboard::upload::UploadResult;
use crate::soundboard::RemoteSound;
use crate::utils::{format_duration, format_file_size};
use crate::SoundclipError;

/// Print a rendered document to the console
pub fn print(content: &str) {
    println!("{}", content.trim_end());
}

fn to_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn sound_json(sound: &RemoteSound) -> serde_json::Value {
    json!({
        "sound_id": sound.sound_id,
        "guild_id": sound.guild_id,
        "name": sound.name,
        "volume": sound.volume,
        "emoji_id": sound.emoji_id,
        "emoji_name": sound.emoji_name,
    })
}

fn clip_json(prepared: &PreparedClip) -> serde_json::Value {
    json!({
        "source": prepared.url,
        "platform": prepared.platform.as_str(),
        "slide": prepared.candidate.ordinal,
        "window": prepared.window,
        "format": prepared.clip.format(),
        "bitrate": prepared.bitrate,
        "size_bytes": prepared.clip.size_bytes(),
    })
}

fn emoji_label(sound: &RemoteSound) -> String {
    match (&sound.emoji_name, &sound.emoji_id) {
        (Some(name), _) => format!("{} ", name),
        (None, Some(id)) => format!("<:{}> ", id),
        (None, None) => String::new(),
    }
}

fn clip_summary(prepared: &PreparedClip) -> String {
    format!(
        "{} slide {} {}, {} at {} ({})",
        prepared.platform.display_name(),
        prepared.candidate.ordinal,
        prepared.window,
        prepared.clip.format(),
        prepared.bitrate,
        format_file_size(prepared.clip.size_bytes())
    )
}

/// A clip rendered for preview
pub fn format_preview(prepared: &PreparedClip, saved_to: &Path, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut value = clip_json(prepared);
            value["saved_to"] = json!(saved_to);
            to_json(&value)
        }
        OutputFormat::Text => Ok(format!(
            "{} {}\n  Saved to: {}",
            style("✔").green(),
            clip_summary(prepared),
            saved_to.display()
        )),
    }
}

/// A clip that was uploaded as a new sound
pub fn format_created(
    prepared: &PreparedClip,
    sound: &RemoteSound,
    saved_to: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut value = json!({
                "sound": sound_json(sound),
                "clip": clip_json(prepared),
            });
            if let Some(path) = saved_to {
                value["clip"]["saved_to"] = json!(path);
            }
            to_json(&value)
        }
        OutputFormat::Text => {
            let mut out = format!(
                "{} Created sound {}{} (ID: {})\n  {}",
                style("✔").green(),
                emoji_label(sound),
                style(&sound.name).bold(),
                sound.sound_id,
                clip_summary(prepared)
            );
            if let Some(path) = saved_to {
                let _ = write!(out, "\n  Clip saved to: {}", path.display());
            }
            Ok(out)
        }
    }
}

pub fn format_sound(sound: &RemoteSound, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&sound_json(sound)),
        OutputFormat::Text => Ok(format!(
            "{}{}\n  ID: {}\n  Guild: {}\n  Volume: {:.2}",
            emoji_label(sound),
            style(&sound.name).bold(),
            sound.sound_id,
            sound.guild_id,
            sound.volume
        )),
    }
}

pub fn format_sounds(guild_id: &str, sounds: &[RemoteSound], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&json!(sounds.iter().map(sound_json).collect::<Vec<_>>())),
        OutputFormat::Text => {
            if sounds.is_empty() {
                return Ok(format!("No soundboard sounds in guild {}", guild_id));
            }

            let mut out = format!("Soundboard sounds in guild {} ({}):", guild_id, sounds.len());
            for sound in sounds {
                let _ = write!(
                    out,
                    "\n  {}{:<32}  {}  volume {:.2}",
                    emoji_label(sound),
                    sound.name,
                    style(&sound.sound_id).dim(),
                    sound.volume
                );
            }
            Ok(out)
        }
    }
}

/// Slides of a post with their audio flags
pub fn format_slides(source: &MediaSource, thumbnails: &[PathBuf], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&json!({
            "source": source.url(),
            "platform": source.platform().as_str(),
            "candidates": source.candidates(),
            "thumbnails": thumbnails,
        })),
        OutputFormat::Text => {
            let mut out = format!(
                "{} {} slide(s) from {}",
                source.candidates().len(),
                source.platform().display_name(),
                source.url()
            );
            for candidate in source.candidates() {
                let audio = if candidate.has_audio {
                    style("audio").green()
                } else {
                    style("no audio").red()
                };
                let _ = write!(
                    out,
                    "\n  [{}] {}  {}",
                    candidate.ordinal,
                    audio,
                    format_duration(candidate.duration_seconds)
                );
                if let Some(title) = &candidate.title {
                    let _ = write!(out, "  {}", title);
                }
            }
            for path in thumbnails {
                let _ = write!(out, "\n  Thumbnail saved to: {}", path.display());
            }
            Ok(out)
        }
    }
}

/// Outcome of a directory upload
pub fn format_bulk(
    result: &UploadResult,
    skipped: &[SkippedSound],
    rejected: &[(PathBuf, SoundclipError)],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let rejected: Vec<_> = rejected
                .iter()
                .map(|(path, e)| json!({"path": path, "kind": e.kind(), "message": e.to_string()}))
                .collect();
            to_json(&json!({
                "succeeded": result.succeeded,
                "failed": result.failed,
                "skipped": skipped,
                "rejected": rejected,
            }))
        }
        OutputFormat::Text => {
            let mut out = format!(
                "Uploaded {} of {} sound(s)",
                style(result.succeeded.len()).green(),
                result.total()
            );
            for uploaded in &result.succeeded {
                let _ = write!(
                    out,
                    "\n  {} {} (ID: {})",
                    style("✔").green(),
                    uploaded.sound.name,
                    uploaded.sound.sound_id
                );
            }
            for failed in &result.failed {
                let _ = write!(
                    out,
                    "\n  {} {} [{}] {}",
                    style("✘").red(),
                    failed.spec.name,
                    failed.kind,
                    failed.message
                );
            }
            for skip in skipped {
                let _ = write!(
                    out,
                    "\n  {} {} already exists (ID: {})",
                    style("-").yellow(),
                    skip.name,
                    skip.existing_id
                );
            }
            for (path, e) in rejected {
                let _ = write!(out, "\n  {} {}: {}", style("✘").red(), path.display(), e);
            }
            Ok(out)
        }
    }
}

/// Bot identity and guild membership
pub fn format_identity(user: &BotUser, guilds: &[GuildSummary], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&json!({"user": user, "guilds": guilds})),
        OutputFormat::Text => {
            let mut out = format!("Logged in as {} (ID: {})", style(&user.username).bold(), user.id);
            let _ = write!(out, "\nGuilds ({}):", guilds.len());
            for guild in guilds {
                let _ = write!(out, "\n  {}  {}", guild.name, style(&guild.id).dim());
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Clip, ClipFormat};
    use crate::extractors::{Candidate, Platform, RawMedia};
    use crate::soundboard::upload::{FailedUpload, UploadedSound};
    use crate::soundboard::SoundSpec;
    use crate::trim::TrimWindow;
    use crate::ErrorKind;

    fn sound(name: &str) -> RemoteSound {
        RemoteSound {
            sound_id: "1106714396018884649".to_string(),
            guild_id: "42".to_string(),
            name: name.to_string(),
            volume: 0.5,
            emoji_id: None,
            emoji_name: Some("📯".to_string()),
        }
    }

    fn prepared() -> PreparedClip {
        PreparedClip {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            platform: Platform::YouTube,
            candidate: Candidate {
                ordinal: 1,
                has_audio: true,
                duration_seconds: 212.0,
                thumbnail: None,
                title: Some("video".to_string()),
                raw: RawMedia::Remote {
                    url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                    playlist_item: None,
                },
            },
            window: TrimWindow::new(43.0, 46.5).unwrap(),
            bitrate: "128k".to_string(),
            clip: Clip::new(vec![0u8; 2048], ClipFormat::Mp3).unwrap(),
        }
    }

    #[test]
    fn test_format_created_json() {
        let out = format_created(&prepared(), &sound("horn"), None, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["sound"]["name"], "horn");
        assert_eq!(value["clip"]["platform"], "youtube");
        assert_eq!(value["clip"]["size_bytes"], 2048);
        assert_eq!(value["clip"]["format"], "mp3");
    }

    #[test]
    fn test_format_sounds_text() {
        let out = format_sounds("42", &[sound("horn"), sound("bell")], OutputFormat::Text).unwrap();
        assert!(out.contains("(2)"));
        assert!(out.contains("horn"));
        assert!(out.contains("bell"));

        let empty = format_sounds("42", &[], OutputFormat::Text).unwrap();
        assert_eq!(empty, "No soundboard sounds in guild 42");
    }

    #[test]
    fn test_format_bulk_json_accounts_for_everything() {
        let result = UploadResult {
            succeeded: vec![UploadedSound {
                index: 0,
                sound: sound("horn"),
                attempts: 1,
            }],
            failed: vec![FailedUpload {
                index: 1,
                spec: SoundSpec::new("x"),
                kind: ErrorKind::Validation,
                message: "Validation failed: name too short".to_string(),
                attempts: 1,
            }],
        };
        let skipped = vec![SkippedSound {
            name: "bell".to_string(),
            existing_id: "7".to_string(),
        }];

        let out = format_bulk(&result, &skipped, &[], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["succeeded"].as_array().unwrap().len(), 1);
        assert_eq!(value["failed"][0]["kind"], "validation");
        assert_eq!(value["skipped"][0]["existing_id"], "7");
    }

    #[test]
    fn test_format_slides_json() {
        let source = MediaSource::new("https://www.instagram.com/p/abc/", Platform::Instagram)
            .with_candidates(vec![prepared().candidate]);
        let out = format_slides(&source, &[], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["candidates"][0]["ordinal"], 1);
        assert_eq!(value["candidates"][0]["raw"]["kind"], "remote");
    }
}

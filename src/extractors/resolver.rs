use std::path::Path;
use url::Url;

use super::{MediaSource, Platform};
use crate::{Result, SoundclipError};

type Matcher = fn(host: &str, segments: &[&str], url: &Url) -> bool;

/// Ordered platform patterns; the first match wins
const MATCHERS: &[(Platform, Matcher)] = &[
    (Platform::YouTube, is_youtube),
    (Platform::Instagram, is_instagram),
    (Platform::Facebook, is_facebook),
];

/// Classifies inputs into a platform or a local file without any network I/O
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceResolver;

impl SourceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Classify an input URL or file path
    pub fn resolve(&self, input: &str) -> Result<MediaSource> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SoundclipError::UnrecognizedSource(
                "input cannot be empty".to_string(),
            ));
        }

        if let Some(platform) = parse_web_url(input).and_then(|url| classify_url(&url)) {
            tracing::debug!("Classified {} as {}", input, platform);
            return Ok(MediaSource::new(input, platform));
        }

        if Path::new(input).is_file() {
            return Ok(MediaSource::new(input, Platform::Local));
        }

        Err(SoundclipError::UnrecognizedSource(format!(
            "{} is not a YouTube, Instagram or Facebook link, nor an existing file",
            input
        )))
    }
}

/// Parse http(s) URLs, tolerating a missing scheme (`youtu.be/abc`)
fn parse_web_url(input: &str) -> Option<Url> {
    if input.starts_with("http://") || input.starts_with("https://") {
        return Url::parse(input).ok();
    }

    if input.contains("://") {
        return None;
    }

    let host = input.split('/').next().unwrap_or_default();
    if host.contains('.') && !host.contains('\\') {
        return Url::parse(&format!("https://{}", input)).ok();
    }

    None
}

/// Run the ordered matchers against a parsed URL
pub fn classify_url(url: &Url) -> Option<Platform> {
    let host = normalize_host(url.host_str()?);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|parts| parts.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default();

    MATCHERS
        .iter()
        .find(|(_, matches)| matches(&host, &segments, url))
        .map(|(platform, _)| *platform)
}

fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    for prefix in ["www.", "m.", "mobile."] {
        if let Some(stripped) = host.strip_prefix(prefix) {
            return stripped.to_string();
        }
    }
    host
}

fn is_id(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_numeric_id(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

fn is_youtube(host: &str, segments: &[&str], url: &Url) -> bool {
    match host {
        "youtube.com" => match segments {
            ["watch"] => query_param(url, "v").map(|v| is_id(&v)).unwrap_or(false),
            ["shorts" | "embed" | "v", id, ..] => is_id(id),
            _ => false,
        },
        "youtu.be" => matches!(segments, [id, ..] if is_id(id)),
        _ => false,
    }
}

fn is_instagram(host: &str, segments: &[&str], _url: &Url) -> bool {
    host == "instagram.com" && matches!(segments, ["p" | "reel" | "reels", id, ..] if is_id(id))
}

fn is_facebook(host: &str, segments: &[&str], url: &Url) -> bool {
    match host {
        "facebook.com" => match segments {
            ["share", "r" | "v", id, ..] => is_id(id),
            ["reel", id, ..] => is_numeric_id(id),
            ["watch"] => query_param(url, "v").map(|v| is_numeric_id(&v)).unwrap_or(false),
            [_, "videos", id, ..] => is_numeric_id(id),
            _ => false,
        },
        "fb.watch" => matches!(segments, [id, ..] if is_id(id)),
        _ => false,
    }
}

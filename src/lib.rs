//! Soundclip - turn short clips from YouTube, Instagram, Facebook or local files
//! into Discord soundboard sounds.
//!
//! The library covers the media pipeline: classifying a source, extracting
//! candidate audio tracks, picking a carousel slide, planning a trim window,
//! rendering a size-bounded clip with ffmpeg and synchronising clips against a
//! guild's soundboard with bounded retries.

pub mod audio;
pub mod carousel;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod soundboard;
pub mod trim;
pub mod utils;

use serde::Serialize;
use std::time::Duration;

pub use audio::{AudioProcessor, Clip, ClipFormat};
pub use carousel::Selection;
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{Candidate, MediaSource, Platform, PlatformAdapter, SourceResolver};
pub use pipeline::SoundPipeline;
pub use soundboard::client::{SoundboardApi, SoundboardClient};
pub use soundboard::upload::{RetryPolicy, UploadOrchestrator, UploadResult};
pub use soundboard::{RemoteSound, SoundPatch, SoundSpec};
pub use trim::{TrimPlanner, TrimWindow};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, SoundclipError>;

/// Error types produced by the clip pipeline and the soundboard client
#[derive(thiserror::Error, Debug)]
pub enum SoundclipError {
    #[error("Unrecognized source: {0}")]
    UnrecognizedSource(String),

    #[error("{0}")]
    PrivateContent(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("{0}")]
    NoAudio(String),

    #[error("{ordinal} is not a slide with audio (slides with audio: {available:?})")]
    InvalidSelection { ordinal: u32, available: Vec<u32> },

    #[error("Invalid trim: {0}")]
    InvalidTrim(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Clip is {size} bytes, over the {limit} byte limit")]
    SizeExceeded { size: u64, limit: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed taxonomy of failure classes, detached from their messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnrecognizedSource,
    PrivateContent,
    RateLimited,
    NoAudio,
    InvalidSelection,
    InvalidTrim,
    Encoding,
    SizeExceeded,
    Validation,
    Permission,
    NotFound,
    Conflict,
    Transient,
    Io,
}

impl SoundclipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SoundclipError::UnrecognizedSource(_) => ErrorKind::UnrecognizedSource,
            SoundclipError::PrivateContent(_) => ErrorKind::PrivateContent,
            SoundclipError::RateLimited { .. } => ErrorKind::RateLimited,
            SoundclipError::NoAudio(_) => ErrorKind::NoAudio,
            SoundclipError::InvalidSelection { .. } => ErrorKind::InvalidSelection,
            SoundclipError::InvalidTrim(_) => ErrorKind::InvalidTrim,
            SoundclipError::Encoding(_) => ErrorKind::Encoding,
            SoundclipError::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            SoundclipError::Validation(_) => ErrorKind::Validation,
            SoundclipError::Permission(_) => ErrorKind::Permission,
            SoundclipError::NotFound(_) => ErrorKind::NotFound,
            SoundclipError::Conflict(_) => ErrorKind::Conflict,
            SoundclipError::Transient(_) => ErrorKind::Transient,
            SoundclipError::Io(_) => ErrorKind::Io,
        }
    }

    /// Only throttling and transport hiccups are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SoundclipError::RateLimited { .. } | SoundclipError::Transient(_)
        )
    }

    /// Server-provided cooldown, if the failure carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SoundclipError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::UnrecognizedSource => "unrecognized_source",
            ErrorKind::PrivateContent => "private_content",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NoAudio => "no_audio",
            ErrorKind::InvalidSelection => "invalid_selection",
            ErrorKind::InvalidTrim => "invalid_trim",
            ErrorKind::Encoding => "encoding",
            ErrorKind::SizeExceeded => "size_exceeded",
            ErrorKind::Validation => "validation",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::Io => "io",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        let rate = SoundclipError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_millis(1500)),
        };
        assert!(rate.is_retryable());
        assert_eq!(rate.retry_after(), Some(Duration::from_millis(1500)));
        assert!(SoundclipError::Transient("503".into()).is_retryable());

        assert!(!SoundclipError::Validation("name".into()).is_retryable());
        assert!(!SoundclipError::NotFound("sound".into()).is_retryable());
        assert!(!SoundclipError::PrivateContent("private".into()).is_retryable());
        assert_eq!(SoundclipError::Conflict("dup".into()).retry_after(), None);
    }

    #[test]
    fn test_kind_display_matches_serde() {
        let kind = SoundclipError::SizeExceeded { size: 600_000, limit: 524_288 }.kind();
        assert_eq!(kind, ErrorKind::SizeExceeded);
        assert_eq!(kind.to_string(), "size_exceeded");
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"size_exceeded\"");
    }
}

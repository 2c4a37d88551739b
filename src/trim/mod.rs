use serde::Serialize;

use crate::extractors::Candidate;
use crate::{Result, SoundclipError};

/// Shortest clip the soundboard accepts, in seconds
pub const MIN_CLIP_SECONDS: f64 = 1.0;

/// Longest clip the soundboard accepts, in seconds
pub const MAX_CLIP_SECONDS: f64 = 5.2;

// Absorbs float noise such as 6.2 - 1.0
const EPSILON: f64 = 1e-9;

/// A `[start, end)` range in seconds with `0 <= start < end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimWindow {
    start_seconds: f64,
    end_seconds: f64,
}

impl TrimWindow {
    pub fn new(start_seconds: f64, end_seconds: f64) -> Result<Self> {
        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(SoundclipError::InvalidTrim(
                "timestamps must be finite numbers".to_string(),
            ));
        }

        if start_seconds < 0.0 {
            return Err(SoundclipError::InvalidTrim(format!(
                "start ({:.2}s) cannot be negative",
                start_seconds
            )));
        }

        if start_seconds >= end_seconds {
            return Err(SoundclipError::InvalidTrim(format!(
                "start ({:.2}s) must be before end ({:.2}s)",
                start_seconds, end_seconds
            )));
        }

        Ok(Self {
            start_seconds,
            end_seconds,
        })
    }

    /// Build a window from user timestamps such as `1:30` and `1:34.5`
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_timestamp(start)?, parse_timestamp(end)?)
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    pub fn length(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

impl std::fmt::Display for TrimWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.2}s, {:.2}s)", self.start_seconds, self.end_seconds)
    }
}

/// Validates requested windows against clip-length policy and media duration
#[derive(Debug, Clone, Copy)]
pub struct TrimPlanner {
    min_seconds: f64,
    max_seconds: f64,
}

impl Default for TrimPlanner {
    fn default() -> Self {
        Self {
            min_seconds: MIN_CLIP_SECONDS,
            max_seconds: MAX_CLIP_SECONDS,
        }
    }
}

impl TrimPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the window to cut from a candidate
    pub fn plan(&self, candidate: &Candidate, requested: TrimWindow) -> Result<TrimWindow> {
        self.plan_for_duration(candidate.duration_seconds, requested)
    }

    /// Clamp `requested` to `duration` and check the resulting length.
    ///
    /// The window is only ever narrowed, never widened.
    pub fn plan_for_duration(&self, duration: f64, requested: TrimWindow) -> Result<TrimWindow> {
        if requested.start_seconds >= duration {
            return Err(SoundclipError::InvalidTrim(format!(
                "start ({:.2}s) is past the end of the media ({:.2}s)",
                requested.start_seconds, duration
            )));
        }

        let end = requested.end_seconds.min(duration);
        if end < requested.end_seconds {
            tracing::debug!(
                "Clamped trim end from {:.2}s to media duration {:.2}s",
                requested.end_seconds,
                duration
            );
        }

        let window = TrimWindow::new(requested.start_seconds, end)?;
        let length = window.length();

        if length + EPSILON < self.min_seconds || length - EPSILON > self.max_seconds {
            return Err(SoundclipError::InvalidTrim(format!(
                "clip length {:.2}s must be between {:.1}s and {:.1}s",
                length, self.min_seconds, self.max_seconds
            )));
        }

        Ok(window)
    }
}

/// Parse a timestamp into seconds.
///
/// Accepted forms are `SS`, `MM:SS` and `HH:MM:SS`, each with optional
/// decimals on the seconds part.
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let timestamp = timestamp.trim();
    let invalid = || {
        SoundclipError::InvalidTrim(format!(
            "Invalid timestamp format: {}. Use MM:SS or HH:MM:SS or SS (decimals supported)",
            timestamp
        ))
    };

    let parts: Vec<&str> = timestamp.split(':').collect();
    if parts.len() > 3 || parts.iter().any(|part| part.is_empty()) {
        return Err(invalid());
    }

    let (whole, seconds) = parts.split_at(parts.len() - 1);
    let seconds = seconds[0];
    if !seconds.chars().all(|c| c.is_ascii_digit() || c == '.') || seconds.starts_with('.') {
        return Err(invalid());
    }
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;

    let mut total = 0.0;
    for part in whole {
        let value: u64 = part.parse().map_err(|_| invalid())?;
        total = total * 60.0 + value as f64;
    }

    Ok(total * 60.0 + seconds)
}

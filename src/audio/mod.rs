use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub mod probe;

pub use probe::MediaProbe;

use crate::trim::TrimWindow;
use crate::{Result, SoundclipError};

/// Hard upload limit for a soundboard sound
pub const MAX_CLIP_BYTES: u64 = 512 * 1024;

/// Formats the soundboard accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClipFormat {
    #[default]
    Mp3,
    Ogg,
}

impl ClipFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipFormat::Mp3 => "mp3",
            ClipFormat::Ogg => "ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(ClipFormat::Mp3),
            "ogg" => Some(ClipFormat::Ogg),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ClipFormat::Mp3 => "audio/mpeg",
            ClipFormat::Ogg => "audio/ogg",
        }
    }

    /// ffmpeg encoder for the format
    fn encoder(&self) -> &'static str {
        match self {
            ClipFormat::Mp3 => "libmp3lame",
            ClipFormat::Ogg => "libvorbis",
        }
    }
}

impl std::fmt::Display for ClipFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rendered clip ready for upload; never larger than [`MAX_CLIP_BYTES`]
#[derive(Clone, PartialEq)]
pub struct Clip {
    bytes: Vec<u8>,
    format: ClipFormat,
}

impl Clip {
    pub fn new(bytes: Vec<u8>, format: ClipFormat) -> Result<Self> {
        let size = bytes.len() as u64;
        if size > MAX_CLIP_BYTES {
            return Err(SoundclipError::SizeExceeded {
                size,
                limit: MAX_CLIP_BYTES,
            });
        }

        Ok(Self { bytes, format })
    }

    /// Load an existing mp3/ogg file as a clip
    pub fn from_file(path: &Path) -> Result<Self> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ClipFormat::from_extension)
            .ok_or_else(|| {
                SoundclipError::Validation(format!(
                    "File must be mp3 or ogg format. Got: {}",
                    path.display()
                ))
            })?;

        Self::new(fs_err::read(path)?, format)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ClipFormat {
        self.format
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `data:` URI the soundboard API expects in the `sound` field
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Save the clip to disk
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs_err::write(path, &self.bytes)?;
        Ok(())
    }
}

impl std::fmt::Debug for Clip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("format", &self.format)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

/// Encoder settings for one render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub format: ClipFormat,
    pub bitrate: String,
    pub mono: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: ClipFormat::Mp3,
            bitrate: "128k".to_string(),
            mono: true,
        }
    }
}

/// Cuts and re-encodes clips with ffmpeg
#[derive(Debug, Clone)]
pub struct AudioProcessor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl AudioProcessor {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Inspect a media file's duration and audio streams
    pub async fn probe(&self, media: &Path) -> Result<MediaProbe> {
        probe::probe_media(&self.ffprobe, media).await
    }

    /// Extract `window` from `source` and encode it.
    ///
    /// Fails with `Encoding` when ffmpeg is missing or exits non-zero and with
    /// `SizeExceeded` when the output is over the upload limit. No retry
    /// happens here; callers may try again with a lower bitrate.
    pub async fn render(&self, source: &Path, window: &TrimWindow, options: &RenderOptions) -> Result<Clip> {
        let scratch = tempfile::Builder::new().prefix("soundclip_render").tempdir()?;
        let output_path = scratch.path().join(format!("clip.{}", options.format.as_str()));

        tracing::debug!(
            "Rendering {} of {} as {} at {}",
            window,
            source.display(),
            options.format,
            options.bitrate
        );

        let output = Command::new(&self.ffmpeg)
            .args(ffmpeg_args(source, window, options, &output_path))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                SoundclipError::Encoding(format!(
                    "could not run {} ({}). Is ffmpeg installed?",
                    self.ffmpeg.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(SoundclipError::Encoding(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                error.trim()
            )));
        }

        let bytes = fs_err::read(&output_path).map_err(|e| {
            SoundclipError::Encoding(format!("ffmpeg produced no output file: {}", e))
        })?;

        let clip = Clip::new(bytes, options.format)?;
        tracing::debug!("Rendered clip is {} bytes", clip.size_bytes());

        Ok(clip)
    }
}

/// Arguments extracting exactly `[start, end)` and re-encoding it
pub fn ffmpeg_args(source: &Path, window: &TrimWindow, options: &RenderOptions, output: &Path) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-ss".to_string(),
        format!("{:.3}", window.start_seconds()),
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
        "-t".to_string(),
        format!("{:.3}", window.length()),
        "-vn".to_string(),
    ];

    if options.mono {
        // Mono halves the size at the same bitrate
        args.extend(["-ac".to_string(), "1".to_string()]);
    }

    args.extend([
        "-c:a".to_string(),
        options.format.encoder().to_string(),
        "-b:a".to_string(),
        options.bitrate.clone(),
        output.to_string_lossy().into_owned(),
    ]);

    args
}

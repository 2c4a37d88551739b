use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod facebook;
pub mod instagram;
pub mod local;
pub mod resolver;
pub mod youtube;
pub mod ytdlp;

pub use resolver::SourceResolver;

use crate::config::ToolsConfig;
use crate::{Result, SoundclipError};

/// Where a piece of media comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
    Facebook,
    Local,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Local => "local",
        }
    }

    /// Human-readable platform name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::Local => "Local File",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Opaque handle to the media behind a candidate.
///
/// Remote media is only downloaded once a candidate has been chosen, so a
/// carousel with ten slides costs one download rather than ten.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawMedia {
    /// A file already on disk
    File { path: PathBuf },

    /// A remote post, optionally narrowed to one playlist item (1-based)
    Remote {
        url: String,
        playlist_item: Option<u32>,
    },
}

/// One media item discovered at a source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Position in the source post, 1-based and never re-indexed
    pub ordinal: u32,

    /// Whether the item carries a decodable audio track
    pub has_audio: bool,

    /// Duration in seconds (0.0 when the platform did not report one)
    pub duration_seconds: f64,

    /// Thumbnail URL if the platform exposes one
    pub thumbnail: Option<String>,

    /// Title or caption of the item
    pub title: Option<String>,

    /// Handle used to download or read the media
    pub raw: RawMedia,
}

/// A classified input together with the candidates fetched for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaSource {
    url: String,
    platform: Platform,
    candidates: Vec<Candidate>,
}

impl MediaSource {
    pub fn new(url: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            platform,
            candidates: Vec::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Attach fetched candidates, producing the fully resolved source
    pub fn with_candidates(self, candidates: Vec<Candidate>) -> Self {
        Self { candidates, ..self }
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Capability every platform adapter provides
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter serves
    fn platform(&self) -> Platform;

    /// Enumerate every candidate at the source, in source order.
    ///
    /// Fails with `NoAudio` when none of the candidates carries sound.
    async fn fetch(&self, source: &MediaSource) -> Result<Vec<Candidate>>;

    /// Materialise a candidate's media as a local file inside `work_dir`
    async fn download(&self, candidate: &Candidate, work_dir: &Path) -> Result<PathBuf>;
}

/// Fail with `NoAudio` unless at least one candidate carries sound
pub(crate) fn ensure_audio(candidates: &[Candidate], what: &str) -> Result<()> {
    if candidates.iter().any(|candidate| candidate.has_audio) {
        return Ok(());
    }

    Err(SoundclipError::NoAudio(format!(
        "No slides with audio found in this {}. Pick a video that has sound.",
        what
    )))
}

/// Registry mapping each platform to its adapter
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    /// Create a registry with the built-in adapters
    pub fn new(tools: &ToolsConfig) -> Self {
        let ytdlp = ytdlp::YtDlp::new(&tools.yt_dlp, tools.ffmpeg_location());

        let mut registry = Self {
            adapters: Vec::new(),
        };

        registry.register(Box::new(youtube::YoutubeAdapter::new(ytdlp.clone())));
        registry.register(Box::new(instagram::InstagramAdapter::new(ytdlp.clone())));
        registry.register(Box::new(facebook::FacebookAdapter::new(ytdlp)));
        registry.register(Box::new(local::LocalFileAdapter::new(&tools.ffprobe)));

        registry
    }

    /// Register an adapter; a later registration for the same platform wins
    pub fn register(&mut self, adapter: Box<dyn PlatformAdapter>) {
        let platform = adapter.platform();
        self.adapters.retain(|existing| existing.platform() != platform);
        self.adapters.push(adapter);
    }

    /// Find the adapter for a platform
    pub fn adapter_for(&self, platform: Platform) -> Result<&dyn PlatformAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.platform() == platform)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| {
                SoundclipError::UnrecognizedSource(format!("no adapter registered for {}", platform))
            })
    }

    /// List all supported platforms
    pub fn list_platforms(&self) -> Vec<Platform> {
        self.adapters.iter().map(|adapter| adapter.platform()).collect()
    }

    /// Fetch candidates for a classified source
    pub async fn fetch(&self, source: MediaSource) -> Result<MediaSource> {
        let adapter = self.adapter_for(source.platform())?;

        tracing::info!("Fetching {} candidates for {}", source.platform(), source.url());
        let candidates = adapter.fetch(&source).await?;
        tracing::debug!("Found {} candidate(s)", candidates.len());

        Ok(source.with_candidates(candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ordinal: u32, has_audio: bool) -> Candidate {
        Candidate {
            ordinal,
            has_audio,
            duration_seconds: if has_audio { 4.0 } else { 0.0 },
            thumbnail: None,
            title: None,
            raw: RawMedia::Remote {
                url: "https://www.instagram.com/p/abc".to_string(),
                playlist_item: Some(ordinal),
            },
        }
    }

    #[test]
    fn test_ensure_audio() {
        assert!(ensure_audio(&[candidate(1, false), candidate(2, true)], "post").is_ok());

        let err = ensure_audio(&[candidate(1, false)], "post").unwrap_err();
        assert!(matches!(err, SoundclipError::NoAudio(_)));
        assert!(ensure_audio(&[], "post").is_err());
    }

    #[test]
    fn test_media_source_with_candidates() {
        let source = MediaSource::new("https://www.instagram.com/p/abc", Platform::Instagram);
        assert!(source.candidates().is_empty());

        let source = source.with_candidates(vec![candidate(1, true), candidate(2, false)]);
        assert_eq!(source.platform(), Platform::Instagram);
        assert_eq!(source.candidates().len(), 2);
        assert_eq!(source.into_candidates()[1].ordinal, 2);
    }

    #[test]
    fn test_registry_covers_every_platform() {
        let registry = AdapterRegistry::new(&ToolsConfig::default());
        let platforms = registry.list_platforms();

        for platform in [Platform::YouTube, Platform::Instagram, Platform::Facebook, Platform::Local] {
            assert!(platforms.contains(&platform));
            assert_eq!(registry.adapter_for(platform).unwrap().platform(), platform);
        }
    }
}

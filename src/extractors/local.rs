use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{Candidate, MediaSource, Platform, PlatformAdapter, RawMedia};
use crate::audio::probe;
use crate::{Result, SoundclipError};

/// Adapter for audio and video files already on disk
pub struct LocalFileAdapter {
    ffprobe: PathBuf,
}

impl LocalFileAdapter {
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Check if the file exists and is non-empty
    async fn validate_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(SoundclipError::UnrecognizedSource(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let metadata = fs::metadata(path).await?;
        if metadata.len() == 0 {
            return Err(SoundclipError::NoAudio(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl PlatformAdapter for LocalFileAdapter {
    fn platform(&self) -> Platform {
        Platform::Local
    }

    async fn fetch(&self, source: &MediaSource) -> Result<Vec<Candidate>> {
        let path = Path::new(source.url());
        self.validate_file(path).await?;

        let media = probe::probe_media(&self.ffprobe, path).await?;
        if !media.has_audio {
            return Err(SoundclipError::NoAudio(format!(
                "File does not contain any audio streams: {}",
                path.display()
            )));
        }

        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string);

        Ok(vec![Candidate {
            ordinal: 1,
            has_audio: true,
            duration_seconds: media.duration_seconds.unwrap_or(0.0),
            thumbnail: None,
            title,
            raw: RawMedia::File { path: absolute },
        }])
    }

    async fn download(&self, candidate: &Candidate, _work_dir: &Path) -> Result<PathBuf> {
        // Local media is rendered in place
        match &candidate.raw {
            RawMedia::File { path } => Ok(path.clone()),
            RawMedia::Remote { url, .. } => Err(SoundclipError::UnrecognizedSource(format!(
                "Local adapter cannot download remote media: {}",
                url
            ))),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_ffprobe(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("ffprobe");
        fs_err::write(&path, format!("#!/bin/sh\ncat <<'JSON'\n{}\nJSON\n", json)).unwrap();
        fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fetch_local_audio() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("airhorn.mp3");
        fs_err::write(&media, b"not really audio").unwrap();
        let ffprobe = fake_ffprobe(
            &dir,
            r#"{"format": {"duration": "7.25"}, "streams": [{"codec_type": "audio"}]}"#,
        );

        let adapter = LocalFileAdapter::new(ffprobe);
        let source = MediaSource::new(media.to_string_lossy(), Platform::Local);
        let candidates = adapter.fetch(&source).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].duration_seconds, 7.25);
        assert_eq!(candidates[0].title.as_deref(), Some("airhorn"));

        let path = adapter.download(&candidates[0], dir.path()).await.unwrap();
        assert_eq!(path, media.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_fetch_video_without_audio() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("silent.mp4");
        fs_err::write(&media, b"frames").unwrap();
        let ffprobe = fake_ffprobe(
            &dir,
            r#"{"format": {"duration": "3.0"}, "streams": [{"codec_type": "video"}]}"#,
        );

        let adapter = LocalFileAdapter::new(ffprobe);
        let source = MediaSource::new(media.to_string_lossy(), Platform::Local);
        let err = adapter.fetch(&source).await.unwrap_err();
        assert!(matches!(err, SoundclipError::NoAudio(_)));
    }

    #[tokio::test]
    async fn test_fetch_empty_file() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("empty.mp3");
        fs_err::write(&media, b"").unwrap();

        let adapter = LocalFileAdapter::new("ffprobe");
        let source = MediaSource::new(media.to_string_lossy(), Platform::Local);
        assert!(adapter.fetch(&source).await.is_err());
    }
}

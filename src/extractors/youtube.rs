use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::ytdlp::{self, ContentLabel, YtDlp};
use super::{Candidate, MediaSource, Platform, PlatformAdapter, RawMedia};
use crate::{Result, SoundclipError};

const LABEL: ContentLabel = ContentLabel {
    platform: "YouTube",
    noun: "video",
};

/// YouTube audio adapter using yt-dlp
pub struct YoutubeAdapter {
    ytdlp: YtDlp,
}

impl YoutubeAdapter {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl PlatformAdapter for YoutubeAdapter {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn fetch(&self, source: &MediaSource) -> Result<Vec<Candidate>> {
        // Playlist context in a watch URL is ignored, only the video counts
        let info = self.ytdlp.dump_info(source.url(), false, LABEL).await?;

        let candidates = vec![ytdlp::single_candidate(&info, source.url())];
        super::ensure_audio(&candidates, LABEL.noun)?;
        Ok(candidates)
    }

    async fn download(&self, candidate: &Candidate, work_dir: &Path) -> Result<PathBuf> {
        let RawMedia::Remote { url, .. } = &candidate.raw else {
            return Err(SoundclipError::Encoding(
                "YouTube candidate does not point at a remote video".to_string(),
            ));
        };

        let stem = ytdlp::download_stem("youtube", candidate);
        self.ytdlp.download_audio(url, None, work_dir, &stem, LABEL).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_ytdlp(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("yt-dlp");
        fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn source() -> MediaSource {
        MediaSource::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL123", Platform::YouTube)
    }

    #[tokio::test]
    async fn test_fetch_without_formats_is_playable() {
        let dir = TempDir::new().unwrap();
        let script = fake_ytdlp(
            &dir,
            r#"echo "$@" > "$(dirname "$0")/args.txt"
echo '{"title": "Never Gonna", "duration": 212.0}'"#,
        );

        let adapter = YoutubeAdapter::new(YtDlp::new(script, None));
        let candidates = adapter.fetch(&source()).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].has_audio);
        assert_eq!(candidates[0].duration_seconds, 212.0);
        assert_eq!(candidates[0].title.as_deref(), Some("Never Gonna"));

        let args = fs_err::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.contains("--no-playlist"));
    }

    #[tokio::test]
    async fn test_fetch_silent_video_is_no_audio() {
        let dir = TempDir::new().unwrap();
        let script = fake_ytdlp(
            &dir,
            r#"echo '{"duration": 30.0, "formats": [{"acodec": "none", "vcodec": "vp9"}]}'"#,
        );

        let adapter = YoutubeAdapter::new(YtDlp::new(script, None));
        let err = adapter.fetch(&source()).await.unwrap_err();
        assert!(matches!(err, SoundclipError::NoAudio(_)));
    }

    #[tokio::test]
    async fn test_download_ignores_playlist_context() {
        let dir = TempDir::new().unwrap();
        let script = fake_ytdlp(
            &dir,
            r#"echo "$@" > "$(dirname "$0")/args.txt"
while [ "$#" -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
out=$(echo "$out" | sed 's/%(ext)s/mp3/')
printf 'ID3' > "$out""#,
        );

        let adapter = YoutubeAdapter::new(YtDlp::new(script, None));
        let candidate = Candidate {
            ordinal: 1,
            has_audio: true,
            duration_seconds: 212.0,
            thumbnail: None,
            title: None,
            raw: RawMedia::Remote {
                url: source().url().to_string(),
                playlist_item: Some(4),
            },
        };

        let path = adapter.download(&candidate, dir.path()).await.unwrap();
        assert!(path.exists());

        let args = fs_err::read_to_string(dir.path().join("args.txt")).unwrap();
        assert!(args.contains("--no-playlist"));
        assert!(!args.contains("--playlist-items"));
    }

    #[tokio::test]
    async fn test_download_reuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let script = fake_ytdlp(&dir, "echo 'ERROR: should not run' >&2\nexit 1");

        let adapter = YoutubeAdapter::new(YtDlp::new(script, None));
        let candidate = Candidate {
            ordinal: 1,
            has_audio: true,
            duration_seconds: 212.0,
            thumbnail: None,
            title: None,
            raw: RawMedia::Remote {
                url: source().url().to_string(),
                playlist_item: None,
            },
        };

        let stem = ytdlp::download_stem("youtube", &candidate);
        let earlier = dir.path().join(format!("{}.mp3", stem));
        fs_err::write(&earlier, b"ID3").unwrap();

        let path = adapter.download(&candidate, dir.path()).await.unwrap();
        assert_eq!(path, earlier);
    }
}

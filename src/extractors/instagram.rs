use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::ytdlp::{self, ContentLabel, YtDlp};
use super::{Candidate, MediaSource, Platform, PlatformAdapter, RawMedia};
use crate::{Result, SoundclipError};

const LABEL: ContentLabel = ContentLabel {
    platform: "Instagram",
    noun: "post",
};

/// Instagram post and reel adapter using yt-dlp.
///
/// Carousel posts come back from yt-dlp as a playlist. Every slide becomes a
/// candidate, including image slides, so slide numbers shown to the user line
/// up with the post.
pub struct InstagramAdapter {
    ytdlp: YtDlp,
}

impl InstagramAdapter {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl PlatformAdapter for InstagramAdapter {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn fetch(&self, source: &MediaSource) -> Result<Vec<Candidate>> {
        let info = self.ytdlp.dump_info(source.url(), true, LABEL).await?;

        let candidates = ytdlp::info_to_candidates(&info, source.url());
        let with_audio = candidates.iter().filter(|c| c.has_audio).count();
        tracing::debug!(
            "Instagram post has {} slide(s), {} with audio",
            candidates.len(),
            with_audio
        );

        super::ensure_audio(&candidates, LABEL.noun)?;
        Ok(candidates)
    }

    async fn download(&self, candidate: &Candidate, work_dir: &Path) -> Result<PathBuf> {
        let RawMedia::Remote { url, playlist_item } = &candidate.raw else {
            return Err(SoundclipError::Encoding(
                "Instagram candidate does not point at a remote post".to_string(),
            ));
        };

        let stem = ytdlp::download_stem("instagram", candidate);
        self.ytdlp
            .download_audio(url, *playlist_item, work_dir, &stem, LABEL)
            .await
    }
}

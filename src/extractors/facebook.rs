use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::ytdlp::{self, ContentLabel, YtDlp};
use super::{Candidate, MediaSource, Platform, PlatformAdapter, RawMedia};
use crate::{Result, SoundclipError};

const LABEL: ContentLabel = ContentLabel {
    platform: "Facebook",
    noun: "reel",
};

/// Facebook reel and video adapter using yt-dlp
pub struct FacebookAdapter {
    ytdlp: YtDlp,
}

impl FacebookAdapter {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl PlatformAdapter for FacebookAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn fetch(&self, source: &MediaSource) -> Result<Vec<Candidate>> {
        let info = self.ytdlp.dump_info(source.url(), false, LABEL).await?;

        // Share links occasionally resolve to a one-item playlist
        let candidates = if info["entries"].is_array() {
            ytdlp::info_to_candidates(&info, source.url())
        } else {
            vec![ytdlp::single_candidate(&info, source.url())]
        };
        super::ensure_audio(&candidates, LABEL.noun)?;

        Ok(candidates)
    }

    async fn download(&self, candidate: &Candidate, work_dir: &Path) -> Result<PathBuf> {
        let RawMedia::Remote { url, playlist_item } = &candidate.raw else {
            return Err(SoundclipError::Encoding(
                "Facebook candidate does not point at a remote reel".to_string(),
            ));
        };

        let stem = ytdlp::download_stem("facebook", candidate);
        self.ytdlp
            .download_audio(url, *playlist_item, work_dir, &stem, LABEL)
            .await
    }
}

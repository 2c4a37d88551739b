use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::audio::{AudioProcessor, Clip, ClipFormat, RenderOptions};
use crate::carousel::Selection;
use crate::config::Config;
use crate::extractors::{AdapterRegistry, Candidate, MediaSource, Platform, RawMedia, SourceResolver};
use crate::soundboard::client::SoundboardApi;
use crate::soundboard::upload::{self, UploadOrchestrator};
use crate::soundboard::{RemoteSound, SoundSpec, MAX_NAME_CHARS, MIN_NAME_CHARS};
use crate::trim::{TrimPlanner, TrimWindow};
use crate::utils;
use crate::{Result, SoundclipError};

/// What to cut and from where
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// URL or local file path
    pub source: String,
    pub start: String,
    pub end: String,

    /// Carousel slide (1-based); the first slide with audio when unset
    pub slide: Option<u32>,
    pub format: ClipFormat,
}

/// A rendered clip along with where it came from
#[derive(Debug, Clone)]
pub struct PreparedClip {
    pub url: String,
    pub platform: Platform,
    pub candidate: Candidate,
    pub window: TrimWindow,
    pub bitrate: String,
    pub clip: Clip,
}

/// Directory contents turned into uploadable items
#[derive(Debug, Default)]
pub struct DirectoryScan {
    pub items: Vec<(SoundSpec, Clip)>,

    /// Files that could not become a sound, with the reason
    pub rejected: Vec<(PathBuf, SoundclipError)>,
}

/// An item left out because the guild already has a sound by that name
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSound {
    pub name: String,
    pub existing_id: String,
}

enum WorkDir {
    Temporary(TempDir),
    Configured(PathBuf),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Temporary(dir) => dir.path(),
            WorkDir::Configured(path) => path,
        }
    }
}

/// End-to-end clip pipeline: resolve, fetch, select, plan, render
pub struct SoundPipeline {
    config: Config,
    resolver: SourceResolver,
    registry: AdapterRegistry,
    processor: AudioProcessor,
    planner: TrimPlanner,
    work_dir: WorkDir,
    quiet: bool,
}

impl SoundPipeline {
    pub fn new(config: Config, quiet: bool) -> Result<Self> {
        let work_dir = match &config.app.work_dir {
            Some(path) => {
                fs_err::create_dir_all(path)?;
                WorkDir::Configured(path.clone())
            }
            None => WorkDir::Temporary(tempfile::Builder::new().prefix("soundclip").tempdir()?),
        };

        tracing::debug!("Working directory: {}", work_dir.path().display());

        Ok(Self {
            resolver: SourceResolver::new(),
            registry: AdapterRegistry::new(&config.tools),
            processor: AudioProcessor::new(&config.tools.ffmpeg, &config.tools.ffprobe),
            planner: TrimPlanner::new(),
            work_dir,
            config,
            quiet,
        })
    }

    /// Classify the input and fetch its candidates
    pub async fn resolve_and_fetch(&self, input: &str) -> Result<MediaSource> {
        let source = self.resolver.resolve(input)?;

        let progress = utils::spinner(
            format!("Fetching {} media...", source.platform().display_name()),
            self.quiet,
        );
        let what = format!("Fetch of {}", source.url());
        let (outcome, _) = upload::retry(&self.config.fetch_policy(), &what, || {
            self.registry.fetch(source.clone())
        })
        .await;
        progress.finish_and_clear();

        outcome
    }

    /// Pick the candidate to cut from
    pub fn select(&self, source: MediaSource, slide: Option<u32>) -> Result<Candidate> {
        let selection = Selection::from_candidates(source.into_candidates())?;
        if selection.is_carousel() {
            let ordinals: Vec<u32> = selection.options().iter().map(|c| c.ordinal).collect();
            tracing::info!("Carousel post; slides with audio: {:?}", ordinals);
        }

        let candidate = selection.pick(slide)?;
        tracing::info!("Using slide {}", candidate.ordinal);
        Ok(candidate)
    }

    /// Produce an upload-ready clip for a request
    pub async fn prepare_clip(&self, request: &ClipRequest) -> Result<PreparedClip> {
        // Caller mistakes surface before any network or subprocess work
        let requested = TrimWindow::parse(&request.start, &request.end)?;

        let source = self.resolve_and_fetch(&request.source).await?;
        let url = source.url().to_string();
        let platform = source.platform();

        let candidate = self.select(source, request.slide)?;
        if candidate.duration_seconds > 0.0 {
            self.planner.plan(&candidate, requested)?;
        }

        let adapter = self.registry.adapter_for(platform)?;
        let progress = utils::spinner("Downloading audio...", self.quiet);
        let downloaded = adapter.download(&candidate, self.work_dir.path()).await;
        progress.finish_and_clear();
        let media_path = downloaded?;

        let result = self.cut(&media_path, &candidate, requested, request.format).await;

        if matches!(candidate.raw, RawMedia::Remote { .. }) && !self.config.app.keep_downloads {
            if let Err(e) = fs_err::remove_file(&media_path) {
                tracing::debug!("Could not remove {}: {}", media_path.display(), e);
            }
        }

        let (window, clip, bitrate) = result?;
        Ok(PreparedClip {
            url,
            platform,
            candidate,
            window,
            bitrate,
            clip,
        })
    }

    async fn cut(
        &self,
        media_path: &Path,
        candidate: &Candidate,
        requested: TrimWindow,
        format: ClipFormat,
    ) -> Result<(TrimWindow, Clip, String)> {
        // The downloaded file is authoritative for duration
        let probe = self.processor.probe(media_path).await?;
        if !probe.has_audio {
            return Err(SoundclipError::NoAudio(format!(
                "Slide {} has no audio track after download. Pick a slide with sound",
                candidate.ordinal
            )));
        }

        let duration = probe.duration_seconds.unwrap_or(candidate.duration_seconds);
        let window = self.planner.plan_for_duration(duration, requested)?;
        tracing::info!("Trimming {} from {:.2}s of media", window, duration);

        let (clip, bitrate) = self.render_within_limit(media_path, &window, format).await?;
        Ok((window, clip, bitrate))
    }

    /// Render at each bitrate of the ladder until the clip fits
    pub async fn render_within_limit(
        &self,
        media_path: &Path,
        window: &TrimWindow,
        format: ClipFormat,
    ) -> Result<(Clip, String)> {
        let mut ladder = self.config.audio.render_ladder(format);
        if ladder.is_empty() {
            ladder.push(RenderOptions {
                format,
                ..RenderOptions::default()
            });
        }

        let progress = utils::spinner("Encoding clip...", self.quiet);
        let mut last_error = None;

        for options in ladder {
            match self.processor.render(media_path, window, &options).await {
                Ok(clip) => {
                    progress.finish_and_clear();
                    tracing::info!(
                        "Encoded {} clip at {} ({})",
                        clip.format(),
                        options.bitrate,
                        utils::format_file_size(clip.size_bytes())
                    );
                    return Ok((clip, options.bitrate));
                }
                Err(e @ SoundclipError::SizeExceeded { .. }) => {
                    tracing::debug!("{} at {}, trying a lower bitrate", e, options.bitrate);
                    last_error = Some(e);
                }
                Err(e) => {
                    progress.finish_and_clear();
                    return Err(e);
                }
            }
        }

        progress.finish_and_clear();
        tracing::warn!("Clip is still too large at the lowest bitrate. Try a shorter clip");
        Err(last_error.unwrap_or_else(|| {
            SoundclipError::Encoding("no bitrate produced a clip".to_string())
        }))
    }

    /// Prepare a clip and upload it as a new sound
    pub async fn create_sound<A: SoundboardApi>(
        &self,
        orchestrator: &UploadOrchestrator<A>,
        guild_id: &str,
        spec: &SoundSpec,
        request: &ClipRequest,
    ) -> Result<(PreparedClip, RemoteSound)> {
        spec.validate()?;

        let prepared = self.prepare_clip(request).await?;

        let progress = utils::spinner(format!("Uploading '{}'...", spec.name), self.quiet);
        let uploaded = orchestrator.create_one(guild_id, spec, &prepared.clip).await;
        progress.finish_and_clear();

        Ok((prepared, uploaded?))
    }
}

/// Derive a valid sound name from a file stem
pub fn sound_name_from_stem(stem: &str) -> String {
    let name: String = stem.chars().take(MAX_NAME_CHARS).collect();
    if name.chars().count() < MIN_NAME_CHARS {
        return format!("sound_{}", name);
    }
    name
}

/// Turn every mp3/ogg file in `dir` into a sound spec and clip, in file-name order
pub fn collect_directory_items(dir: &Path, volume: f64) -> Result<DirectoryScan> {
    if !dir.is_dir() {
        return Err(SoundclipError::Validation(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(ClipFormat::from_extension)
                    .is_some()
        })
        .collect();
    files.sort();

    let mut scan = DirectoryScan::default();
    for path in files {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let spec = SoundSpec::new(sound_name_from_stem(stem)).with_volume(volume);

        match spec.validate().and_then(|_| Clip::from_file(&path)) {
            Ok(clip) => scan.items.push((spec, clip)),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                scan.rejected.push((path, e));
            }
        }
    }

    tracing::info!(
        "Found {} sound file(s) in {} ({} rejected)",
        scan.items.len(),
        dir.display(),
        scan.rejected.len()
    );
    Ok(scan)
}

/// Drop items whose name is already taken in the guild
pub fn skip_existing(
    items: Vec<(SoundSpec, Clip)>,
    existing: &[RemoteSound],
) -> (Vec<(SoundSpec, Clip)>, Vec<SkippedSound>) {
    let mut keep = Vec::new();
    let mut skipped = Vec::new();

    for (spec, clip) in items {
        match existing.iter().find(|sound| sound.name == spec.name) {
            Some(sound) => skipped.push(SkippedSound {
                name: spec.name,
                existing_id: sound.sound_id.clone(),
            }),
            None => keep.push((spec, clip)),
        }
    }

    (keep, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str, id: &str) -> RemoteSound {
        RemoteSound {
            sound_id: id.to_string(),
            guild_id: "42".to_string(),
            name: name.to_string(),
            volume: 1.0,
            emoji_id: None,
            emoji_name: None,
        }
    }

    #[test]
    fn test_sound_name_from_stem() {
        assert_eq!(sound_name_from_stem("airhorn"), "airhorn");
        assert_eq!(sound_name_from_stem("a"), "sound_a");
        assert_eq!(sound_name_from_stem(&"x".repeat(40)), "x".repeat(32));
        assert_eq!(sound_name_from_stem("🎺"), "sound_🎺");
    }

    #[test]
    fn test_collect_directory_items() {
        let dir = TempDir::new().unwrap();
        fs_err::write(dir.path().join("b_horn.mp3"), b"ID3").unwrap();
        fs_err::write(dir.path().join("a_bell.OGG"), b"OggS").unwrap();
        fs_err::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs_err::write(dir.path().join("huge.mp3"), vec![0u8; 600_000]).unwrap();

        let scan = collect_directory_items(dir.path(), 0.5).unwrap();
        let names: Vec<&str> = scan.items.iter().map(|(spec, _)| spec.name.as_str()).collect();
        assert_eq!(names, vec!["a_bell", "b_horn"]);
        assert!(scan.items.iter().all(|(spec, _)| spec.volume == 0.5));
        assert_eq!(scan.items[0].1.format(), ClipFormat::Ogg);

        assert_eq!(scan.rejected.len(), 1);
        assert!(matches!(scan.rejected[0].1, SoundclipError::SizeExceeded { .. }));
    }

    #[test]
    fn test_collect_directory_missing() {
        let err = collect_directory_items(Path::new("/nonexistent/sounds"), 1.0).unwrap_err();
        assert!(matches!(err, SoundclipError::Validation(_)));
    }

    #[test]
    fn test_skip_existing() {
        let clip = Clip::new(vec![1], ClipFormat::Mp3).unwrap();
        let items = vec![
            (SoundSpec::new("horn"), clip.clone()),
            (SoundSpec::new("bell"), clip),
        ];

        let (keep, skipped) = skip_existing(items, &[remote("horn", "7")]);
        assert_eq!(keep.len(), 1);
        assert_eq!(keep[0].0.name, "bell");
        assert_eq!(skipped[0].name, "horn");
        assert_eq!(skipped[0].existing_id, "7");
    }

    #[tokio::test]
    async fn test_bad_trim_fails_before_fetch() {
        let pipeline = SoundPipeline::new(Config::default(), true).unwrap();
        let request = ClipRequest {
            source: "https://www.instagram.com/p/abc123/".to_string(),
            start: "5".to_string(),
            end: "2".to_string(),
            slide: None,
            format: ClipFormat::Mp3,
        };

        let err = pipeline.prepare_clip(&request).await.unwrap_err();
        assert!(matches!(err, SoundclipError::InvalidTrim(_)));
    }

    #[tokio::test]
    async fn test_unrecognized_source() {
        let pipeline = SoundPipeline::new(Config::default(), true).unwrap();
        let err = pipeline
            .resolve_and_fetch("https://example.com/video.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, SoundclipError::UnrecognizedSource(_)));
    }

    #[cfg(unix)]
    mod fake_tools {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn executable(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs_err::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs_err::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        /// Config whose ffprobe reports 10s of audio and whose ffmpeg only
        /// fits the limit below 96k
        fn config(dir: &TempDir) -> Config {
            let mut config = Config::default();
            config.tools.ffprobe = executable(
                dir,
                "ffprobe",
                r#"echo '{"format": {"duration": "10.000000"}, "streams": [{"codec_type": "audio"}]}'"#,
            );
            config.tools.ffmpeg = executable(
                dir,
                "ffmpeg",
                r#"for last; do :; done
case "$*" in
  *"-b:a 128k"*|*"-b:a 96k"*) size=600000 ;;
  *) size=48000 ;;
esac
head -c $size /dev/zero > "$last""#,
            );
            config
        }

        fn request(source: &Path, start: &str, end: &str) -> ClipRequest {
            ClipRequest {
                source: source.to_string_lossy().into_owned(),
                start: start.to_string(),
                end: end.to_string(),
                slide: None,
                format: ClipFormat::Mp3,
            }
        }

        #[tokio::test]
        async fn test_prepare_local_clip_walks_bitrate_ladder() {
            let dir = TempDir::new().unwrap();
            let media = dir.path().join("horn.mp3");
            fs_err::write(&media, b"ID3 not really audio").unwrap();

            let pipeline = SoundPipeline::new(config(&dir), true).unwrap();
            let prepared = pipeline
                .prepare_clip(&request(&media, "1", "4.5"))
                .await
                .unwrap();

            assert_eq!(prepared.platform, Platform::Local);
            assert_eq!(prepared.bitrate, "64k");
            assert_eq!(prepared.clip.size_bytes(), 48_000);
            assert_eq!(prepared.window, TrimWindow::new(1.0, 4.5).unwrap());
            assert_eq!(prepared.candidate.title.as_deref(), Some("horn"));
            // Local media is never removed
            assert!(media.exists());
        }

        #[tokio::test]
        async fn test_prepare_clip_clamps_to_duration() {
            let dir = TempDir::new().unwrap();
            let media = dir.path().join("horn.mp3");
            fs_err::write(&media, b"ID3").unwrap();

            let pipeline = SoundPipeline::new(config(&dir), true).unwrap();
            let prepared = pipeline
                .prepare_clip(&request(&media, "7", "12"))
                .await
                .unwrap();
            assert_eq!(prepared.window.end_seconds(), 10.0);

            let err = pipeline
                .prepare_clip(&request(&media, "9.5", "12"))
                .await
                .unwrap_err();
            assert!(matches!(err, SoundclipError::InvalidTrim(_)));
        }

        #[tokio::test]
        async fn test_ladder_exhausted_surfaces_size_exceeded() {
            let dir = TempDir::new().unwrap();
            let media = dir.path().join("horn.mp3");
            fs_err::write(&media, b"ID3").unwrap();

            let mut config = config(&dir);
            config.audio.bitrates = vec!["128k".to_string(), "96k".to_string()];
            let pipeline = SoundPipeline::new(config, true).unwrap();

            let window = TrimWindow::new(0.0, 3.0).unwrap();
            let err = pipeline
                .render_within_limit(&media, &window, ClipFormat::Mp3)
                .await
                .unwrap_err();
            assert!(matches!(err, SoundclipError::SizeExceeded { size: 600_000, .. }));
        }

        #[tokio::test]
        async fn test_create_sound_validates_before_work() {
            use crate::soundboard::client::MockSoundboardApi;
            use crate::soundboard::upload::RetryPolicy;

            let dir = TempDir::new().unwrap();
            let media = dir.path().join("horn.mp3");
            fs_err::write(&media, b"ID3").unwrap();

            let mut api = MockSoundboardApi::new();
            api.expect_create().times(0);
            let orchestrator = UploadOrchestrator::new(api, RetryPolicy::once());

            let pipeline = SoundPipeline::new(config(&dir), true).unwrap();
            let err = pipeline
                .create_sound(&orchestrator, "42", &SoundSpec::new("x"), &request(&media, "0", "2"))
                .await
                .unwrap_err();
            assert!(matches!(err, SoundclipError::Validation(_)));
        }

        #[tokio::test]
        async fn test_create_sound_uploads_rendered_clip() {
            use crate::soundboard::client::MockSoundboardApi;
            use crate::soundboard::upload::RetryPolicy;

            let dir = TempDir::new().unwrap();
            let media = dir.path().join("horn.mp3");
            fs_err::write(&media, b"ID3").unwrap();

            let mut api = MockSoundboardApi::new();
            api.expect_create()
                .withf(|guild, spec, clip| guild == "42" && spec.name == "horn" && clip.size_bytes() == 48_000)
                .times(1)
                .returning(|_, spec, _| Ok(remote(&spec.name, "99")));
            let orchestrator = UploadOrchestrator::new(api, RetryPolicy::once());

            let pipeline = SoundPipeline::new(config(&dir), true).unwrap();
            let (prepared, sound) = pipeline
                .create_sound(&orchestrator, "42", &SoundSpec::new("horn"), &request(&media, "0", "2"))
                .await
                .unwrap();
            assert_eq!(prepared.bitrate, "64k");
            assert_eq!(sound.sound_id, "99");
        }
    }
}

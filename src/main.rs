use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundclip::audio::ClipFormat;
use soundclip::cli::{Cli, Commands};
use soundclip::config::{Config, ToolsConfig};
use soundclip::extractors::{AdapterRegistry, MediaSource, Platform};
use soundclip::output;
use soundclip::pipeline::{self, ClipRequest, SoundPipeline};
use soundclip::soundboard::client::{SoundboardApi, SoundboardClient};
use soundclip::soundboard::transport::HttpTransport;
use soundclip::soundboard::upload::{DeleteOutcome, UploadOrchestrator};
use soundclip::soundboard::{SoundPatch, SoundSpec};
use soundclip::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        config: config_path,
        token,
        verbose,
        quiet,
        json_logs,
    } = Cli::parse();

    init_tracing(verbose, quiet, json_logs);

    match command {
        Commands::Create {
            source,
            start,
            end,
            name,
            guild,
            volume,
            emoji,
            emoji_id,
            slide,
            codec,
            save_clip,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            warn_missing_tools(&config.tools).await;

            let guild_id = resolve_guild(guild, &config)?;
            let orchestrator = UploadOrchestrator::new(
                soundboard_client(token.as_deref(), &config)?,
                config.retry_policy(),
            );

            let mut spec = SoundSpec::new(name).with_volume(volume);
            if let Some(emoji) = emoji {
                spec = spec.with_emoji_name(emoji);
            }
            if let Some(emoji_id) = emoji_id {
                spec = spec.with_emoji_id(emoji_id);
            }

            let request = ClipRequest {
                source,
                start,
                end,
                slide,
                format: codec.map(ClipFormat::from).unwrap_or(config.audio.format),
            };

            let pipeline = SoundPipeline::new(config, quiet)?;
            tracing::info!("Creating sound '{}' from {}", spec.name, request.source);

            let (prepared, sound) = pipeline
                .create_sound(&orchestrator, &guild_id, &spec, &request)
                .await?;

            if let Some(path) = &save_clip {
                prepared.clip.write_to(path)?;
            }

            output::print(&output::format_created(&prepared, &sound, save_clip.as_deref(), format)?);
        }
        Commands::Preview {
            source,
            start,
            end,
            slide,
            codec,
            output: output_path,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            warn_missing_tools(&config.tools).await;

            let request = ClipRequest {
                source,
                start,
                end,
                slide,
                format: codec.map(ClipFormat::from).unwrap_or(config.audio.format),
            };

            let pipeline = SoundPipeline::new(config, quiet)?;
            let prepared = pipeline.prepare_clip(&request).await?;
            prepared.clip.write_to(&output_path)?;

            output::print(&output::format_preview(&prepared, &output_path, format)?);
        }
        Commands::Slides {
            source,
            thumbnails,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            warn_missing_tools(&config.tools).await;

            let pipeline = SoundPipeline::new(config, quiet)?;
            let media = pipeline.resolve_and_fetch(&source).await?;

            let saved = match &thumbnails {
                Some(dir) => save_thumbnails(&media, dir).await?,
                None => Vec::new(),
            };

            output::print(&output::format_slides(&media, &saved, format)?);
        }
        Commands::List { guild, format } => {
            let config = load_config(config_path.as_deref()).await?;
            let guild_id = resolve_guild(guild, &config)?;
            let client = soundboard_client(token.as_deref(), &config)?;

            let sounds = client.list(&guild_id).await?;
            output::print(&output::format_sounds(&guild_id, &sounds, format)?);
        }
        Commands::Get {
            sound_id,
            guild,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            let guild_id = resolve_guild(guild, &config)?;
            let client = soundboard_client(token.as_deref(), &config)?;

            let sound = client.get(&guild_id, &sound_id).await?;
            output::print(&output::format_sound(&sound, format)?);
        }
        Commands::Update {
            sound_id,
            guild,
            name,
            volume,
            emoji,
            emoji_id,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            let guild_id = resolve_guild(guild, &config)?;
            let client = soundboard_client(token.as_deref(), &config)?;

            let patch = SoundPatch {
                name,
                volume,
                emoji_id,
                emoji_name: emoji,
            };
            let sound = client.update(&guild_id, &sound_id, &patch).await?;
            output::print(&output::format_sound(&sound, format)?);
        }
        Commands::Delete { sound_id, guild } => {
            let config = load_config(config_path.as_deref()).await?;
            let guild_id = resolve_guild(guild, &config)?;
            let orchestrator = UploadOrchestrator::new(
                soundboard_client(token.as_deref(), &config)?,
                config.retry_policy(),
            );

            match orchestrator.delete(&guild_id, &sound_id).await? {
                DeleteOutcome::Deleted => println!("Deleted sound {}", sound_id),
                DeleteOutcome::AlreadyGone => println!("Sound {} was already gone", sound_id),
            }
        }
        Commands::UploadDir {
            dir,
            guild,
            volume,
            skip_existing,
            format,
        } => {
            let config = load_config(config_path.as_deref()).await?;
            let guild_id = resolve_guild(guild, &config)?;
            let orchestrator = UploadOrchestrator::new(
                soundboard_client(token.as_deref(), &config)?,
                config.retry_policy(),
            );

            let scan = pipeline::collect_directory_items(&dir, volume)?;

            let (items, skipped) = if skip_existing {
                let existing = orchestrator.api().list(&guild_id).await?;
                pipeline::skip_existing(scan.items, &existing)
            } else {
                (scan.items, Vec::new())
            };

            let progress = utils::spinner(format!("Uploading {} sound(s)...", items.len()), quiet);
            let result = orchestrator.bulk_create(&guild_id, items).await;
            progress.finish_and_clear();

            output::print(&output::format_bulk(&result, &skipped, &scan.rejected, format)?);

            if !result.is_complete_success() || !scan.rejected.is_empty() {
                anyhow::bail!(
                    "{} file(s) could not be uploaded",
                    result.failed.len() + scan.rejected.len()
                );
            }
        }
        Commands::Whoami { format } => {
            let config = load_config(config_path.as_deref()).await?;
            let client = soundboard_client(token.as_deref(), &config)?;

            let user = client.bot_user().await?;
            let guilds = client.guilds().await?;
            output::print(&output::format_identity(&user, &guilds, format)?);
        }
        Commands::Config { show } => {
            let config = load_config(config_path.as_deref()).await?;
            if show {
                config.display();
            } else {
                let path = match config_path {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Edit it to change tool paths, bitrates or retry limits; run with --show to inspect.");
            }
        }
        Commands::Platforms => {
            let registry = AdapterRegistry::new(&ToolsConfig::default());
            println!("Supported platforms:");
            for platform in registry.list_platforms() {
                println!("  • {} ({})", platform.display_name(), platform_inputs(platform));
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber; logs go to stderr so stdout stays parseable
fn init_tracing(verbose: bool, quiet: bool, json: bool) {
    let default_filter = if verbose {
        "soundclip=debug"
    } else if quiet {
        "soundclip=warn"
    } else {
        "soundclip=info"
    };

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
    );

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load().await?,
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Check for required external tools (non-fatal)
async fn warn_missing_tools(tools: &ToolsConfig) {
    let missing = utils::check_dependencies(tools).await;
    if !missing.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}

fn resolve_guild(flag: Option<String>, config: &Config) -> Result<String> {
    flag.or_else(|| config.discord.default_guild_id.clone())
        .filter(|id| !id.trim().is_empty())
        .context("No guild specified. Pass --guild, set DISCORD_GUILD_ID or discord.default_guild_id in the config")
}

fn soundboard_client(token: Option<&str>, config: &Config) -> Result<SoundboardClient<HttpTransport>> {
    let transport = HttpTransport::new(
        &config.discord.api_base,
        token.unwrap_or_default(),
        config.request_timeout(),
    )?;
    Ok(SoundboardClient::new(transport))
}

/// Download every slide thumbnail into `dir`
async fn save_thumbnails(media: &MediaSource, dir: &Path) -> Result<Vec<PathBuf>> {
    fs_err::create_dir_all(dir)?;
    let client = reqwest::Client::new();
    let mut saved = Vec::new();

    for candidate in media.candidates() {
        let Some(thumbnail) = &candidate.thumbnail else {
            continue;
        };

        let extension = url::Url::parse(thumbnail)
            .ok()
            .and_then(|url| {
                Path::new(url.path())
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_lowercase)
            })
            .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
            .unwrap_or_else(|| "jpg".to_string());

        let path = dir.join(format!("slide_{}.{}", candidate.ordinal, extension));
        match utils::download_to_file(&client, thumbnail, &path).await {
            Ok(_) => saved.push(path),
            Err(e) => tracing::warn!("Could not save thumbnail for slide {}: {}", candidate.ordinal, e),
        }
    }

    Ok(saved)
}

fn platform_inputs(platform: Platform) -> &'static str {
    match platform {
        Platform::YouTube => "youtube.com/watch, youtube.com/shorts, youtu.be",
        Platform::Instagram => "instagram.com/p, instagram.com/reel, carousels included",
        Platform::Facebook => "facebook.com/share/r, facebook.com/reel, facebook.com/watch, fb.watch",
        Platform::Local => "local audio and video files",
    }
}

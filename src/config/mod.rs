use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::{ClipFormat, RenderOptions};
use crate::soundboard::upload::RetryPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord API settings
    pub discord: DiscordConfig,

    /// External binaries
    pub tools: ToolsConfig,

    /// Clip encoding
    pub audio: AudioConfig,

    /// Upload retry behaviour
    pub upload: UploadConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// REST API base URL
    pub api_base: String,

    /// Guild used when a command does not name one
    pub default_guild_id: Option<String>,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            default_guild_id: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ToolsConfig {
    /// Directory yt-dlp should look in for ffmpeg, when ffmpeg is not on PATH
    pub fn ffmpeg_location(&self) -> Option<PathBuf> {
        self.ffmpeg
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub format: ClipFormat,

    /// Bitrates tried in order until the clip fits the upload limit
    pub bitrates: Vec<String>,

    /// Downmix to a single channel
    pub mono: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            format: ClipFormat::Mp3,
            bitrates: ["128k", "96k", "64k", "48k", "32k"]
                .iter()
                .map(|b| b.to_string())
                .collect(),
            mono: true,
        }
    }
}

impl AudioConfig {
    /// Render options for every rung of the bitrate ladder
    pub fn render_ladder(&self, format: ClipFormat) -> Vec<RenderOptions> {
        self.bitrates
            .iter()
            .map(|bitrate| RenderOptions {
                format,
                bitrate: bitrate.clone(),
                mono: self.mono,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Attempts per sound, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,

    /// Attempts for a platform fetch; 1 disables fetch retries
    pub fetch_attempts: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            fetch_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for downloads; a temporary directory is used when unset
    pub work_dir: Option<PathBuf>,

    /// Keep downloaded media after the clip is rendered
    pub keep_downloads: bool,
}

impl Config {
    /// Load configuration from the default location, creating it on first run
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path).await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("soundclip.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("soundclip").join("config.yaml"))
    }

    /// Apply the `DISCORD_GUILD_ID` environment override through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(guild_id) = non_empty("DISCORD_GUILD_ID") {
            self.discord.default_guild_id = Some(guild_id);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.discord.api_base.trim().is_empty() {
            anyhow::bail!("discord.api_base must not be empty");
        }
        if self.upload.max_attempts == 0 {
            anyhow::bail!("upload.max_attempts must be at least 1");
        }
        if self.audio.bitrates.is_empty() {
            anyhow::bail!("audio.bitrates must list at least one bitrate");
        }

        Ok(())
    }

    /// Retry policy for remote soundboard calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload.max_attempts,
            base_delay: Duration::from_millis(self.upload.base_delay_ms),
            max_delay: Duration::from_millis(self.upload.max_delay_ms),
        }
    }

    /// Retry policy for platform fetches
    pub fn fetch_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload.fetch_attempts.max(1),
            ..self.retry_policy()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.discord.request_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  API Base: {}", self.discord.api_base);
        println!(
            "  Default Guild: {}",
            self.discord.default_guild_id.as_deref().unwrap_or("(not set)")
        );
        println!("  yt-dlp: {}", self.tools.yt_dlp.display());
        println!("  ffmpeg: {}", self.tools.ffmpeg.display());
        println!("  ffprobe: {}", self.tools.ffprobe.display());
        println!("  Clip Format: {}", self.audio.format);
        println!("  Bitrates: {}", self.audio.bitrates.join(", "));
        println!("  Upload Attempts: {}", self.upload.max_attempts);
        if let Some(work_dir) = &self.app.work_dir {
            println!("  Work Dir: {}", work_dir.display());
        }
        println!("  Keep Downloads: {}", self.app.keep_downloads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            "discord:\n  default_guild_id: \"123\"\naudio:\n  format: ogg\n",
        )
        .unwrap();

        assert_eq!(config.discord.default_guild_id.as_deref(), Some("123"));
        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
        assert_eq!(config.audio.format, ClipFormat::Ogg);
        assert_eq!(config.audio.bitrates.len(), 5);
        assert_eq!(config.upload.max_attempts, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.upload.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.bitrates.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discord.api_base = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("DISCORD_GUILD_ID", "987")].into_iter().collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.discord.default_guild_id.as_deref(), Some("987"));

        let blank: HashMap<&str, &str> = [("DISCORD_GUILD_ID", "  ")].into_iter().collect();
        config.apply_overrides(|key| blank.get(key).map(|v| v.to_string()));
        assert_eq!(config.discord.default_guild_id.as_deref(), Some("987"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("soundclip.yaml");
        fs_err::write(&path, "upload:\n  max_attempts: 2\n  base_delay_ms: 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(config.fetch_policy().max_attempts, 1);

        fs_err::write(&path, "upload:\n  max_attempts: 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.app.keep_downloads = true;
        config.save_to(&path).await.unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_ffmpeg_location() {
        assert_eq!(ToolsConfig::default().ffmpeg_location(), None);

        let tools = ToolsConfig {
            ffmpeg: PathBuf::from("/opt/ffmpeg/bin/ffmpeg"),
            ..Default::default()
        };
        assert_eq!(tools.ffmpeg_location(), Some(PathBuf::from("/opt/ffmpeg/bin")));
    }

    #[test]
    fn test_render_ladder() {
        let ladder = AudioConfig::default().render_ladder(ClipFormat::Ogg);
        assert_eq!(ladder.len(), 5);
        assert_eq!(ladder[0].bitrate, "128k");
        assert!(ladder.iter().all(|o| o.mono && o.format == ClipFormat::Ogg));
    }
}

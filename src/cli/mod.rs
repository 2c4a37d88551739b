use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::audio::ClipFormat;

#[derive(Parser)]
#[command(
    name = "soundclip",
    about = "Soundclip - Turn short clips from YouTube, Instagram, Facebook or local files into Discord soundboard sounds",
    version,
    long_about = "A CLI tool that cuts a 1 to 5.2 second clip out of a YouTube video, an Instagram post or reel (including multi-slide carousels), a Facebook video or a local media file, encodes it under the 512 KB soundboard limit and uploads it to a Discord guild. Also lists, edits and deletes existing soundboard sounds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./soundclip.yaml or the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Discord bot token
    #[arg(long, global = true, env = "DISCORD_API_KEY", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut a clip from a URL or local file and upload it as a soundboard sound
    Create {
        /// YouTube, Instagram or Facebook URL, or a local audio/video file
        #[arg(value_name = "URL_OR_FILE")]
        source: String,

        /// Clip start (SS, MM:SS or HH:MM:SS, decimals allowed)
        #[arg(short, long)]
        start: String,

        /// Clip end (SS, MM:SS or HH:MM:SS, decimals allowed)
        #[arg(short, long)]
        end: String,

        /// Sound name (2-32 characters)
        #[arg(short, long)]
        name: String,

        /// Guild to upload to (defaults to the configured guild)
        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,

        /// Playback volume between 0.0 and 1.0
        #[arg(long, default_value = "1.0")]
        volume: f64,

        /// Unicode emoji shown next to the sound
        #[arg(long, conflicts_with = "emoji_id")]
        emoji: Option<String>,

        /// Custom emoji id shown next to the sound
        #[arg(long)]
        emoji_id: Option<String>,

        /// Carousel slide to use (1-based; first slide with audio if omitted)
        #[arg(long, value_name = "N")]
        slide: Option<u32>,

        /// Clip codec (defaults to the configured format)
        #[arg(long, value_enum)]
        codec: Option<Codec>,

        /// Also save the rendered clip to this path
        #[arg(long, value_name = "FILE")]
        save_clip: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Cut a clip and save it locally without uploading
    Preview {
        #[arg(value_name = "URL_OR_FILE")]
        source: String,

        /// Clip start
        #[arg(short, long)]
        start: String,

        /// Clip end
        #[arg(short, long)]
        end: String,

        /// Carousel slide to use
        #[arg(long, value_name = "N")]
        slide: Option<u32>,

        /// Clip codec (defaults to the configured format)
        #[arg(long, value_enum)]
        codec: Option<Codec>,

        /// Where to write the clip
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the slides of a post and which of them carry audio
    Slides {
        #[arg(value_name = "URL_OR_FILE")]
        source: String,

        /// Download each slide's thumbnail into this directory
        #[arg(long, value_name = "DIR")]
        thumbnails: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the sounds of a guild
    List {
        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one sound
    Get {
        sound_id: String,

        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change the name, volume or emoji of a sound
    Update {
        sound_id: String,

        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,

        /// New name (2-32 characters)
        #[arg(short, long)]
        name: Option<String>,

        /// New volume between 0.0 and 1.0
        #[arg(long)]
        volume: Option<f64>,

        /// New unicode emoji
        #[arg(long, conflicts_with = "emoji_id")]
        emoji: Option<String>,

        /// New custom emoji id
        #[arg(long)]
        emoji_id: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a sound
    Delete {
        sound_id: String,

        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,
    },

    /// Upload every mp3/ogg file in a directory
    UploadDir {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[arg(short, long, env = "DISCORD_GUILD_ID")]
        guild: Option<String>,

        /// Volume applied to every sound
        #[arg(long, default_value = "1.0")]
        volume: f64,

        /// Skip files whose name already exists in the guild
        #[arg(long)]
        skip_existing: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the bot account behind the token and its guilds
    Whoami {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable summary
    Text,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    Ogg,
}

impl From<Codec> for ClipFormat {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Mp3 => ClipFormat::Mp3,
            Codec::Ogg => ClipFormat::Ogg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "soundclip",
            "create",
            "https://www.instagram.com/p/abc/",
            "--start",
            "0:01",
            "--end",
            "0:04.5",
            "--name",
            "horn",
            "--guild",
            "42",
            "--slide",
            "2",
            "--codec",
            "ogg",
        ])
        .unwrap();

        match cli.command {
            Commands::Create {
                slide, codec, guild, volume, ..
            } => {
                assert_eq!(slide, Some(2));
                assert_eq!(codec.map(ClipFormat::from), Some(ClipFormat::Ogg));
                assert_eq!(guild.as_deref(), Some("42"));
                assert_eq!(volume, 1.0);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_emoji_flags_conflict() {
        let result = Cli::try_parse_from([
            "soundclip", "update", "123", "--guild", "42", "--emoji", "📯", "--emoji-id", "55",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["soundclip", "platforms", "-v", "--json-logs"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
    }
}

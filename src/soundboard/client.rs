use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::transport::{Transport, TransportError, TransportResponse};
use super::{RemoteSound, SoundPatch, SoundSpec};
use crate::audio::{Clip, MAX_CLIP_BYTES};
use crate::{Result, SoundclipError};

/// Remote soundboard lifecycle operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SoundboardApi: Send + Sync {
    /// Upload a new sound. Validation happens before any network call.
    async fn create(&self, guild_id: &str, spec: &SoundSpec, clip: &Clip) -> Result<RemoteSound>;

    async fn list(&self, guild_id: &str) -> Result<Vec<RemoteSound>>;

    async fn get(&self, guild_id: &str, sound_id: &str) -> Result<RemoteSound>;

    async fn update(&self, guild_id: &str, sound_id: &str, patch: &SoundPatch) -> Result<RemoteSound>;

    /// Delete a sound; deleting an id that is already gone yields `NotFound`
    async fn delete(&self, guild_id: &str, sound_id: &str) -> Result<()>;
}

/// The authenticated bot account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
}

/// A guild the bot belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
}

/// Error body returned by the API
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<u64>,
    retry_after: Option<f64>,
}

/// The list endpoint answers either a bare array or `{"items": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum SoundList {
    Wrapped { items: Vec<RemoteSound> },
    Bare(Vec<RemoteSound>),
}

/// Typed CRUD client over a guild's soundboard
pub struct SoundboardClient<T> {
    transport: T,
}

impl<T: Transport> SoundboardClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get information about the authenticated bot
    pub async fn bot_user(&self) -> Result<BotUser> {
        let response = self.send(Method::GET, "/users/@me", None).await?;
        expect_success(response, "bot user").and_then(|r| decode(&r))
    }

    /// Get list of guilds the bot is in
    pub async fn guilds(&self) -> Result<Vec<GuildSummary>> {
        let response = self.send(Method::GET, "/users/@me/guilds", None).await?;
        expect_success(response, "guilds").and_then(|r| decode(&r))
    }

    async fn send(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<TransportResponse> {
        self.transport
            .request(method, endpoint, body)
            .await
            .map_err(transport_failure)
    }
}

#[async_trait]
impl<T: Transport> SoundboardApi for SoundboardClient<T> {
    async fn create(&self, guild_id: &str, spec: &SoundSpec, clip: &Clip) -> Result<RemoteSound> {
        spec.validate()?;
        if clip.size_bytes() > MAX_CLIP_BYTES {
            return Err(SoundclipError::Validation(format!(
                "File size ({} bytes) exceeds the limit of {} bytes",
                clip.size_bytes(),
                MAX_CLIP_BYTES
            )));
        }

        let mut payload = json!({
            "name": spec.name,
            "sound": clip.data_uri(),
            "volume": spec.volume,
        });
        if let Some(emoji_id) = &spec.emoji_id {
            payload["emoji_id"] = json!(emoji_id);
        }
        if let Some(emoji_name) = &spec.emoji_name {
            payload["emoji_name"] = json!(emoji_name);
        }

        let endpoint = format!("/guilds/{}/soundboard-sounds", guild_id);
        let response = self.send(Method::POST, &endpoint, Some(payload)).await?;
        let response = expect_success(response, &format!("guild {}", guild_id))?;

        let sound = with_guild(decode::<RemoteSound>(&response)?, guild_id);
        tracing::info!("Created soundboard sound: {} (ID: {})", sound.name, sound.sound_id);
        Ok(sound)
    }

    async fn list(&self, guild_id: &str) -> Result<Vec<RemoteSound>> {
        let endpoint = format!("/guilds/{}/soundboard-sounds", guild_id);
        let response = self.send(Method::GET, &endpoint, None).await?;
        let response = expect_success(response, &format!("guild {}", guild_id))?;

        let sounds = match decode::<SoundList>(&response)? {
            SoundList::Wrapped { items } => items,
            SoundList::Bare(items) => items,
        };

        Ok(sounds
            .into_iter()
            .map(|sound| with_guild(sound, guild_id))
            .collect())
    }

    async fn get(&self, guild_id: &str, sound_id: &str) -> Result<RemoteSound> {
        let endpoint = format!("/guilds/{}/soundboard-sounds/{}", guild_id, sound_id);
        let response = self.send(Method::GET, &endpoint, None).await?;
        let response = expect_success(response, &format!("soundboard sound {}", sound_id))?;

        Ok(with_guild(decode(&response)?, guild_id))
    }

    async fn update(&self, guild_id: &str, sound_id: &str, patch: &SoundPatch) -> Result<RemoteSound> {
        patch.validate()?;

        let payload = serde_json::to_value(patch)
            .map_err(|e| SoundclipError::Validation(format!("could not encode update: {}", e)))?;

        let endpoint = format!("/guilds/{}/soundboard-sounds/{}", guild_id, sound_id);
        let response = self.send(Method::PATCH, &endpoint, Some(payload)).await?;
        let response = expect_success(response, &format!("soundboard sound {}", sound_id))?;

        let sound = with_guild(decode::<RemoteSound>(&response)?, guild_id);
        tracing::info!("Updated soundboard sound: {}", sound.name);
        Ok(sound)
    }

    async fn delete(&self, guild_id: &str, sound_id: &str) -> Result<()> {
        let endpoint = format!("/guilds/{}/soundboard-sounds/{}", guild_id, sound_id);
        let response = self.send(Method::DELETE, &endpoint, None).await?;
        expect_success(response, &format!("soundboard sound {}", sound_id))?;

        tracing::info!("Deleted soundboard sound: {}", sound_id);
        Ok(())
    }
}

fn with_guild(mut sound: RemoteSound, guild_id: &str) -> RemoteSound {
    if sound.guild_id.is_empty() {
        sound.guild_id = guild_id.to_string();
    }
    sound
}

fn transport_failure(error: TransportError) -> SoundclipError {
    SoundclipError::Transient(error.to_string())
}

fn decode<D: DeserializeOwned>(response: &TransportResponse) -> Result<D> {
    serde_json::from_slice(&response.body)
        .map_err(|e| SoundclipError::Transient(format!("malformed response: {}", e)))
}

/// Pass 2xx responses through and map everything else onto the taxonomy
fn expect_success(response: TransportResponse, subject: &str) -> Result<TransportResponse> {
    if response.is_success() {
        return Ok(response);
    }
    Err(map_status(&response, subject))
}

/// Longest server-requested wait honoured before retrying
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Translate a non-2xx response into an error.
///
/// 5xx and 408 are transient, 429 is rate limited, every other 4xx is a
/// non-retryable client error.
pub fn map_status(response: &TransportResponse, subject: &str) -> SoundclipError {
    let body: ApiErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();
    let message = body
        .message
        .clone()
        .unwrap_or_else(|| format!("HTTP {}", response.status));
    let detail = match body.code {
        Some(code) => format!("{} (code {})", message, code),
        None => message,
    };

    match response.status {
        401 => SoundclipError::Permission(format!("invalid or expired bot token: {}", detail)),
        403 => SoundclipError::Permission(format!(
            "Bot lacks permission to manage soundboard sounds for {}: {}",
            subject, detail
        )),
        404 => SoundclipError::NotFound(format!("{} not found", subject)),
        409 => SoundclipError::Conflict(detail),
        429 => SoundclipError::RateLimited {
            message: detail,
            retry_after: body
                .retry_after
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map(|wait| wait.min(MAX_RETRY_AFTER)),
        },
        408 | 500..=599 => SoundclipError::Transient(format!("{} ({})", detail, response.status)),
        _ => SoundclipError::Validation(format!("Invalid request: {}", detail)),
    }
}

//! Soundboard data model and the remote CRUD surface.

use serde::{Deserialize, Serialize};

pub mod client;
pub mod transport;
pub mod upload;

use crate::{Result, SoundclipError};

/// Shortest accepted sound name, in characters
pub const MIN_NAME_CHARS: usize = 2;

/// Longest accepted sound name, in characters
pub const MAX_NAME_CHARS: usize = 32;

/// Caller-supplied description of a sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSpec {
    pub name: String,
    pub volume: f64,
    pub emoji_id: Option<String>,
    pub emoji_name: Option<String>,
}

impl SoundSpec {
    /// A spec at full volume with no emoji
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: 1.0,
            emoji_id: None,
            emoji_name: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_emoji_name(mut self, emoji: impl Into<String>) -> Self {
        self.emoji_name = Some(emoji.into());
        self
    }

    pub fn with_emoji_id(mut self, emoji_id: impl Into<String>) -> Self {
        self.emoji_id = Some(emoji_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_volume(self.volume)?;
        validate_emoji(self.emoji_id.as_deref(), self.emoji_name.as_deref())
    }
}

/// Partial update; only present fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SoundPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji_name: Option<String>,
}

impl SoundPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.volume.is_none() && self.emoji_id.is_none() && self.emoji_name.is_none()
    }

    /// Same rules as [`SoundSpec::validate`] for every field present
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(SoundclipError::Validation(
                "At least one field must be provided to update".to_string(),
            ));
        }

        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(volume) = self.volume {
            validate_volume(volume)?;
        }
        validate_emoji(self.emoji_id.as_deref(), self.emoji_name.as_deref())
    }
}

/// A sound as stored by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSound {
    pub sound_id: String,
    #[serde(default)]
    pub guild_id: String,
    pub name: String,
    pub volume: f64,
    #[serde(default)]
    pub emoji_id: Option<String>,
    #[serde(default)]
    pub emoji_name: Option<String>,
}

impl RemoteSound {
    /// Whether the remote state matches what was submitted
    #[cfg(test)]
    pub(crate) fn matches(&self, spec: &SoundSpec) -> bool {
        self.name == spec.name
            && (self.volume - spec.volume).abs() < 1e-6
            && self.emoji_id == spec.emoji_id
            && self.emoji_name == spec.emoji_name
    }
}

fn validate_name(name: &str) -> Result<()> {
    let length = name.chars().count();
    if !(MIN_NAME_CHARS..=MAX_NAME_CHARS).contains(&length) {
        return Err(SoundclipError::Validation(format!(
            "Sound name must be between {} and {} characters (got {})",
            MIN_NAME_CHARS, MAX_NAME_CHARS, length
        )));
    }
    Ok(())
}

fn validate_volume(volume: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(SoundclipError::Validation(format!(
            "Volume must be between 0.0 and 1.0 (got {})",
            volume
        )));
    }
    Ok(())
}

fn validate_emoji(emoji_id: Option<&str>, emoji_name: Option<&str>) -> Result<()> {
    if emoji_id.is_some() && emoji_name.is_some() {
        return Err(SoundclipError::Validation(
            "Set either a custom emoji id or a unicode emoji, not both".to_string(),
        ));
    }
    if let Some(id) = emoji_id {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(SoundclipError::Validation(format!(
                "Custom emoji id must be numeric (got {:?})",
                id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_counts_characters() {
        assert!(SoundSpec::new("ok").validate().is_ok());
        assert!(SoundSpec::new("x").validate().is_err());
        assert!(SoundSpec::new("a".repeat(32)).validate().is_ok());
        assert!(SoundSpec::new("a".repeat(33)).validate().is_err());
        // 4 characters, 16 bytes
        assert!(SoundSpec::new("🎺🎺🎺🎺").validate().is_ok());
    }

    #[test]
    fn test_volume_range() {
        assert!(SoundSpec::new("horn").with_volume(0.0).validate().is_ok());
        assert!(SoundSpec::new("horn").with_volume(1.0).validate().is_ok());
        assert!(SoundSpec::new("horn").with_volume(1.01).validate().is_err());
        assert!(SoundSpec::new("horn").with_volume(-0.1).validate().is_err());
        assert!(SoundSpec::new("horn").with_volume(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_emoji_rules() {
        assert!(SoundSpec::new("horn").with_emoji_name("📯").validate().is_ok());
        assert!(SoundSpec::new("horn").with_emoji_id("123456789").validate().is_ok());
        assert!(SoundSpec::new("horn").with_emoji_id("abc").validate().is_err());
        assert!(SoundSpec::new("horn")
            .with_emoji_id("1")
            .with_emoji_name("📯")
            .validate()
            .is_err());
    }

    #[test]
    fn test_patch_validation() {
        assert!(SoundPatch::default().validate().is_err());

        let rename = SoundPatch {
            name: Some("a".to_string()),
            ..Default::default()
        };
        assert!(matches!(rename.validate(), Err(SoundclipError::Validation(_))));

        let quieter = SoundPatch {
            volume: Some(0.4),
            ..Default::default()
        };
        assert!(quieter.validate().is_ok());
        assert_eq!(serde_json::to_value(&quieter).unwrap(), serde_json::json!({"volume": 0.4}));
    }

    #[test]
    fn test_remote_sound_deserialize() {
        let sound: RemoteSound = serde_json::from_value(serde_json::json!({
            "sound_id": "1106714396018884649",
            "name": "airhorn",
            "volume": 0.5,
            "emoji_id": null,
            "emoji_name": "📯",
            "available": true,
            "user": {"id": "1"}
        }))
        .unwrap();

        assert_eq!(sound.guild_id, "");
        assert!(sound.matches(&SoundSpec::new("airhorn").with_volume(0.5).with_emoji_name("📯")));
    }
}

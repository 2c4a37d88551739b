use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use super::client::SoundboardApi;
use super::{RemoteSound, SoundSpec};
use crate::audio::Clip;
use crate::{ErrorKind, Result, SoundclipError};

/// Bounded exponential backoff for retryable failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    ///
    /// Doubles from `base_delay` and is capped at `max_delay`; a server-provided
    /// `retry_after` raises the delay but is never shortened by the cap.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let computed = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        match retry_after {
            Some(floor) if floor > computed => floor,
            _ => computed,
        }
    }
}

/// Run `operation` until it succeeds, fails non-retryably or exhausts the policy.
///
/// Returns the final outcome together with the number of attempts made.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut operation: F) -> (Result<T>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return (Ok(value), attempt),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt, e.retry_after());
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// A sound that made it to the remote collection
#[derive(Debug, Clone, Serialize)]
pub struct UploadedSound {
    /// Position in the input batch
    pub index: usize,
    pub sound: RemoteSound,
    pub attempts: u32,
}

/// A batch item that could not be created
#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub index: usize,
    pub spec: SoundSpec,
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// Outcome of a bulk create; every input item lands in exactly one list
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadResult {
    pub succeeded: Vec<UploadedSound>,
    pub failed: Vec<FailedUpload>,
}

impl UploadResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What a delete ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The sound no longer existed, e.g. an earlier attempt already removed it
    AlreadyGone,
}

/// Sequences sound creations against the remote API with retry and
/// partial-failure bookkeeping
pub struct UploadOrchestrator<A> {
    api: A,
    policy: RetryPolicy,
}

impl<A: SoundboardApi> UploadOrchestrator<A> {
    pub fn new(api: A, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create a single sound, raising the terminal error once retries run out
    pub async fn create_one(&self, guild_id: &str, spec: &SoundSpec, clip: &Clip) -> Result<RemoteSound> {
        let what = format!("Upload of '{}'", spec.name);
        let (outcome, attempts) = retry(&self.policy, &what, || self.api.create(guild_id, spec, clip)).await;

        if let Err(e) = &outcome {
            tracing::error!("{} gave up after {} attempt(s): {}", what, attempts, e);
        }
        outcome
    }

    /// Create every item in input order.
    ///
    /// A failing item never aborts the batch; it is recorded in `failed` and
    /// processing moves on to the next one.
    pub async fn bulk_create(&self, guild_id: &str, items: Vec<(SoundSpec, Clip)>) -> UploadResult {
        let total = items.len();
        let mut result = UploadResult::default();

        for (index, (spec, clip)) in items.into_iter().enumerate() {
            tracing::info!("Uploading {}/{}: {}", index + 1, total, spec.name);

            let what = format!("Upload of '{}'", spec.name);
            let (outcome, attempts) =
                retry(&self.policy, &what, || self.api.create(guild_id, &spec, &clip)).await;

            match outcome {
                Ok(sound) => result.succeeded.push(UploadedSound {
                    index,
                    sound,
                    attempts,
                }),
                Err(e) => {
                    tracing::warn!("Failed to upload '{}': {}", spec.name, e);
                    result.failed.push(FailedUpload {
                        index,
                        kind: e.kind(),
                        message: e.to_string(),
                        spec,
                        attempts,
                    });
                }
            }
        }

        tracing::info!(
            "Bulk upload finished: {} succeeded, {} failed",
            result.succeeded.len(),
            result.failed.len()
        );
        result
    }

    /// Delete a sound; a sound that is already gone counts as deleted
    pub async fn delete(&self, guild_id: &str, sound_id: &str) -> Result<DeleteOutcome> {
        let what = format!("Delete of {}", sound_id);
        let (outcome, _) = retry(&self.policy, &what, || self.api.delete(guild_id, sound_id)).await;

        match outcome {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(SoundclipError::NotFound(message)) => {
                tracing::debug!("Sound {} already gone: {}", sound_id, message);
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(e) => Err(e),
        }
    }
}

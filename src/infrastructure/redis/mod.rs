pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::RedisService;

#[derive(Debug, Error)]
#[error("completion guard unavailable: {0}")]
pub struct GuardError(pub String);

/// Short-lived, per-job marker that keeps concurrent completion signals from
/// fetching the same artifact from the provider twice.
#[async_trait]
pub trait CompletionGuard: Send + Sync {
    /// `true` if this caller now holds the marker for `job_id`.
    async fn try_claim(&self, job_id: &str) -> Result<bool, GuardError>;

    /// Drops the marker so a later signal may retry after a failed publish.
    async fn release(&self, job_id: &str) -> Result<(), GuardError>;
}

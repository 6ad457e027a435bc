pub mod assembly_ai;

use crate::modules::transcript::model::{ArtifactFormat, JobId, ReportedStatus};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use assembly_ai::AssemblyAiClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the request (bad source URL, bad credentials, ...).
    #[error("provider rejected request: {0}")]
    Rejected(String),
    #[error("provider has no such job: {0}")]
    NotFound(String),
    /// Network failure, timeout or 5xx. Safe to retry.
    #[error("provider temporarily unavailable: {0}")]
    Transient(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// External asynchronous transcription service.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Queues a job for the media at `source_url` and returns immediately.
    async fn submit(&self, source_url: &str, webhook_url: Option<&str>) -> Result<JobId, ProviderError>;

    /// Hands media bytes to the provider's own storage and returns a URL `submit` accepts.
    async fn upload_source(&self, body: Bytes) -> Result<String, ProviderError>;

    async fn status(&self, job_id: &JobId) -> Result<ReportedStatus, ProviderError>;

    /// Only meaningful once the job reported `Completed`.
    async fn fetch_artifact(&self, job_id: &JobId, format: ArtifactFormat) -> Result<Bytes, ProviderError>;
}

//! Normalization of the two completion signals into [`CompletionEvent`].

use super::model::{CompletionEvent, InvalidJobId, JobId, ReportedStatus};
use crate::infrastructure::provider::{ProviderError, TranscriptionProvider};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Status values a provider may push.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

/// Provider-pushed notification. AssemblyAI sends `transcript_id`; other
/// spellings of the id are accepted as well.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    #[serde(alias = "id", alias = "job_id", alias = "jobID")]
    pub transcript_id: String,
    pub status: WebhookStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum WebhookRejection {
    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidJobId(#[from] InvalidJobId),
}

const WEBHOOK_ERROR_FALLBACK: &str = "Transcription failed";

impl CompletionEvent {
    /// Webhook path: the payload already carries the status.
    pub fn from_webhook(body: &[u8]) -> Result<Self, WebhookRejection> {
        let payload: WebhookPayload = serde_json::from_slice(body)?;
        Ok(Self::from_webhook_payload(payload)?)
    }

    pub fn from_webhook_payload(payload: WebhookPayload) -> Result<Self, InvalidJobId> {
        let job_id = JobId::parse(&payload.transcript_id)?;
        let status = match payload.status {
            WebhookStatus::Queued => ReportedStatus::Queued,
            WebhookStatus::Processing | WebhookStatus::Unknown => ReportedStatus::Processing,
            WebhookStatus::Completed => ReportedStatus::Completed,
            WebhookStatus::Error => ReportedStatus::Error(
                payload
                    .error
                    .unwrap_or_else(|| WEBHOOK_ERROR_FALLBACK.to_string()),
            ),
        };

        Ok(Self { job_id, status })
    }

    /// Poll path: one status check against the provider.
    pub async fn from_poll(
        provider: &dyn TranscriptionProvider,
        job_id: JobId,
    ) -> Result<Self, ProviderError> {
        let status = provider.status(&job_id).await?;
        Ok(Self { job_id, status })
    }
}

use super::model::{JobId, JobState};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    /// Unknown when the provider could not be reached.
    pub state: Option<JobState>,
    pub retry_after_secs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

use crate::common::response::ApiError;
use crate::infrastructure::storage::StoreError;
use crate::modules::transcript::model::InvalidJobId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The provider refused to create the job.
    #[error("{0}")]
    SubmissionFailed(String),
    /// The provider reported the job as failed; carries its message verbatim.
    #[error("{0}")]
    JobFailed(String),
    #[error("Object Not Found: {0}")]
    ArtifactNotFound(String),
    #[error("Job Not Found: {0}")]
    JobNotFound(String),
    /// Network, timeout or 5xx from the provider. Safe to retry.
    #[error("Transcription provider unavailable: {0}")]
    TransientProvider(String),
    #[error("Transcription provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Wait for job {0} was cancelled")]
    Cancelled(String),
    #[error("Job {job_id} still pending after {attempts} status checks")]
    WaitExhausted { job_id: String, attempts: u32 },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SubmissionFailed(_) | AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::JobFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ArtifactNotFound(_) | AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::TransientProvider(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Cancelled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WaitExhausted { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<InvalidJobId> for AppError {
    fn from(err: InvalidJobId) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!("{}", self);
        }
        ApiError(self.to_string(), self.status_code()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failure_message_is_verbatim() {
        let err = AppError::JobFailed("Download error, unable to download".to_string());
        assert_eq!(err.to_string(), "Download error, unable to download");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::SubmissionFailed("bad url".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::ArtifactNotFound("x.srt".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::TransientProvider("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(InvalidJobId("a/b".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}

use utoipa::OpenApi;
use crate::modules::transcript::dto::{JobStatusResponse, WebhookAck};
use crate::modules::transcript::events::{WebhookPayload, WebhookStatus};
use crate::modules::transcript::model::{JobId, JobState};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::transcript::handler::upload_file,
        crate::modules::transcript::handler::get_artifact,
        crate::modules::transcript::handler::webhook,
        crate::modules::transcript::handler::poll_job,
    ),
    components(
        schemas(
            JobId, JobState, JobStatusResponse, WebhookAck,
            WebhookPayload, WebhookStatus,
        )
    ),
    tags(
        (name = "Transcripts", description = "Upload media and collect finished transcripts")
    )
)]
pub struct ApiDoc;

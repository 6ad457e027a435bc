use super::dto::{JobStatusResponse, WebhookAck};
use super::model::{CompletionEvent, JobId, JobState, Outcome};
use crate::common::error::AppError;
use crate::common::response::ApiResponse;
use crate::common::upload::read_file_field;
use crate::infrastructure::provider::ProviderError;
use crate::infrastructure::storage::StoredObject;
use crate::state::AppState;
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<body>
	<form action="/upload" method="post" enctype="multipart/form-data">
		<label for="file">Upload an audio or video file:</label> <br>
		<input type="file" name="file" id="file" /><br>
		<button type="submit">Submit</button>
	</form>
</body>"#;

pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Upload media and start a transcription job
///
/// Redirects to the URL where the transcript will appear.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Job submitted; Location points at the eventual artifact"),
        (status = 400, description = "Bad Request"),
        (status = 502, description = "Provider rejected the job"),
        (status = 503, description = "Provider unavailable")
    ),
    tag = "Transcripts"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let upload = read_file_field(multipart).await?;

    let job = state
        .reconciler
        .submit_upload(&upload.file_name, &upload.content_type, upload.body)
        .await?;

    let location = state
        .keys
        .submission_location(&job, state.config.webhook_enabled);
    info!("Redirecting uploader of {} to {}", upload.file_name, location);

    Ok(Redirect::to(&location))
}

/// Fetch a stored object (uploaded source or published artifact)
#[utoipa::path(
    get,
    path = "/artifact/{key}",
    params(
        ("key" = String, Path, description = "Storage key, e.g. <job id>.srt")
    ),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 304, description = "Not Modified"),
        (status = 404, description = "Object Not Found")
    ),
    tag = "Transcripts"
)]
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match state.store.get(&key).await? {
        Some(object) => Ok(serve_object(object, &headers)),
        None => Err(AppError::ArtifactNotFound(key)),
    }
}

/// Provider completion callback
///
/// Always acknowledged so the provider does not redeliver indefinitely.
#[utoipa::path(
    post,
    path = "/webhook",
    request_body = super::events::WebhookPayload,
    responses(
        (status = 200, description = "Acknowledged", body = WebhookAck)
    ),
    tag = "Transcripts"
)]
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match CompletionEvent::from_webhook(&body) {
        Ok(event) => {
            let job_id = event.job_id.clone();
            match state.reconciler.on_completion_signal(event).await {
                Ok(outcome) => info!("Webhook for {} handled: {:?}", job_id, outcome),
                Err(e) => error!("Webhook for {} not reconciled: {}", job_id, e),
            }
        }
        Err(e) => warn!("Ignoring webhook: {}", e),
    }

    (StatusCode::OK, Json(WebhookAck::ok()))
}

/// Poll a job
///
/// Serves the artifact once ready; otherwise asks the client to retry.
#[utoipa::path(
    get,
    path = "/job/{job_id}",
    params(
        ("job_id" = String, Path, description = "Provider job id")
    ),
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 202, description = "Not ready yet; retry after the hinted delay", body = ApiResponse<JobStatusResponse>),
        (status = 404, description = "Job Not Found"),
        (status = 422, description = "Transcription failed; message is the provider's")
    ),
    tag = "Transcripts"
)]
pub async fn poll_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let job_id = JobId::parse(&job_id)?;

    let event = match CompletionEvent::from_poll(state.provider.as_ref(), job_id.clone()).await {
        Ok(event) => event,
        Err(ProviderError::Transient(msg)) => {
            warn!("Status check for {} failed, asking client to retry: {}", job_id, msg);
            return Ok(pending_response(&state, job_id, None));
        }
        Err(ProviderError::NotFound(_)) => return Err(AppError::JobNotFound(job_id.to_string())),
        Err(e) => return Err(AppError::Provider(e.to_string())),
    };

    let job_state = JobState::from(&event.status);

    match state.reconciler.on_completion_signal(event).await {
        Ok(Outcome::Pending) => Ok(pending_response(&state, job_id, Some(job_state))),
        Ok(Outcome::Ready(key)) => match state.store.get(&key).await? {
            Some(object) => Ok(serve_object(object, &headers)),
            None => Ok(pending_response(&state, job_id, Some(job_state))),
        },
        Ok(Outcome::Failed(message)) => Err(AppError::JobFailed(message)),
        Err(AppError::TransientProvider(msg)) => {
            warn!("Publishing {} hit a transient error, asking client to retry: {}", job_id, msg);
            Ok(pending_response(&state, job_id, Some(job_state)))
        }
        Err(e) => Err(e),
    }
}

fn pending_response(state: &AppState, job_id: JobId, job_state: Option<JobState>) -> Response {
    let retry_after_secs = state.config.poll_interval.as_secs().max(1);
    let body = ApiResponse::pending(
        JobStatusResponse {
            job_id,
            state: job_state,
            retry_after_secs,
        },
        "Transcript not ready yet",
    );

    let retry = HeaderValue::from(retry_after_secs);
    (
        StatusCode::ACCEPTED,
        [(header::RETRY_AFTER, retry.clone()), (header::REFRESH, retry)],
        Json(body),
    )
        .into_response()
}

fn serve_object(object: StoredObject, request_headers: &HeaderMap) -> Response {
    let not_modified = match (&object.etag, request_headers.get(header::IF_NONE_MATCH)) {
        (Some(etag), Some(candidates)) => candidates
            .to_str()
            .map(|list| list.split(',').any(|c| c.trim() == etag.as_str() || c.trim() == "*"))
            .unwrap_or(false),
        _ => false,
    };

    let mut builder = Response::builder();

    if let Some(et) = &object.etag {
        builder = builder.header(header::ETAG, et);
    }

    if not_modified {
        return builder
            .status(StatusCode::NOT_MODIFIED)
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }

    let content_type = object
        .content_type
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    builder
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, object.body.len())
        .body(Body::from(object.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

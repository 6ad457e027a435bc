//! AssemblyAI v2 REST client.
//!
//! Transcript objects come back either as a transcript or as an error object
//! (`{"status": "error", "error": "..."}`, or `{"error": "..."}` on non-2xx
//! responses). Both shapes are folded into [`ReportedStatus`] or [`ProviderError`]
//! here so callers only ever match on variants.

use super::{ProviderError, TranscriptionProvider};
use crate::modules::transcript::model::{ArtifactFormat, JobId, ReportedStatus};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_ERROR_MESSAGE: &str = "Transcription failed";

#[derive(Debug, Serialize)]
struct CreateTranscriptRequest<'a> {
    audio_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TranscriptResponse {
    fn into_status(self) -> ReportedStatus {
        match self.status {
            TranscriptStatus::Queued => ReportedStatus::Queued,
            // A status this client does not know yet is still not terminal.
            TranscriptStatus::Processing | TranscriptStatus::Unknown => ReportedStatus::Processing,
            TranscriptStatus::Completed => ReportedStatus::Completed,
            TranscriptStatus::Error => ReportedStatus::Error(
                self.error
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct AssemblyAiClient {
    client: reqwest::Client,
    base_url: String,
    caption_chars: Option<u32>,
}

impl AssemblyAiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
        caption_chars: Option<u32>,
    ) -> Result<Self, ProviderError> {
        let mut headers = reqwest::header::HeaderMap::new();

        let mut header_value = reqwest::header::HeaderValue::from_str(api_key).map_err(|e| {
            warn!("Failed to create auth header: {:?}", e);
            ProviderError::Rejected("Invalid API key format".to_string())
        })?;
        header_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, header_value);

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::InvalidResponse(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            caption_chars,
        })
    }

    fn transcript_url(&self, job_id: &JobId) -> String {
        format!("{}/transcript/{}", self.base_url, job_id)
    }

    async fn get_transcript(&self, job_id: &JobId) -> Result<TranscriptResponse, ProviderError> {
        let response = self
            .client
            .get(self.transcript_url(job_id))
            .send()
            .await
            .map_err(transport_error)?;

        let response = ensure_success(response).await?;
        response.json().await.map_err(transport_error)
    }
}

/// Timeouts and connection failures are transient; undecodable bodies are not.
fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_decode() {
        warn!("Failed to parse AssemblyAI response: {:?}", e);
        ProviderError::InvalidResponse("Invalid response from AssemblyAI".to_string())
    } else {
        warn!("AssemblyAI request failed: {:?}", e);
        ProviderError::Transient(e.to_string())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&raw)
        .map(|body| body.error)
        .unwrap_or(raw);
    error!("AssemblyAI API {}: {}", status, message);

    Err(match status {
        StatusCode::NOT_FOUND => ProviderError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => ProviderError::Transient(message),
        s if s.is_server_error() => ProviderError::Transient(message),
        _ => ProviderError::Rejected(message),
    })
}

#[async_trait]
impl TranscriptionProvider for AssemblyAiClient {
    async fn submit(&self, source_url: &str, webhook_url: Option<&str>) -> Result<JobId, ProviderError> {
        let url = format!("{}/transcript", self.base_url);
        debug!("Creating AssemblyAI transcript for audio: {}", source_url);

        let response = self
            .client
            .post(&url)
            .json(&CreateTranscriptRequest {
                audio_url: source_url,
                webhook_url,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let transcript: TranscriptResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        if transcript.status == TranscriptStatus::Error {
            return Err(ProviderError::Rejected(
                transcript
                    .error
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            ));
        }

        let job_id = JobId::parse(&transcript.id)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        info!("Created AssemblyAI transcript with ID: {}", job_id);
        Ok(job_id)
    }

    async fn upload_source(&self, body: Bytes) -> Result<String, ProviderError> {
        let size = body.len();
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let upload: UploadResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        info!("Uploaded {} bytes to AssemblyAI", size);
        Ok(upload.upload_url)
    }

    async fn status(&self, job_id: &JobId) -> Result<ReportedStatus, ProviderError> {
        Ok(self.get_transcript(job_id).await?.into_status())
    }

    async fn fetch_artifact(&self, job_id: &JobId, format: ArtifactFormat) -> Result<Bytes, ProviderError> {
        let subtitle_kind = match format {
            ArtifactFormat::Srt => "srt",
            ArtifactFormat::Vtt => "vtt",
            ArtifactFormat::Text => {
                let transcript = self.get_transcript(job_id).await?;
                return transcript.text.map(Bytes::from).ok_or_else(|| {
                    ProviderError::InvalidResponse(format!("transcript {} has no text", job_id))
                });
            }
        };

        let mut url = format!("{}/{}", self.transcript_url(job_id), subtitle_kind);
        if let Some(chars) = self.caption_chars {
            url.push_str(&format!("?chars_per_caption={}", chars));
        }

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let body = ensure_success(response)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;

        debug!("Fetched {} bytes of {} for {}", body.len(), subtitle_kind, job_id);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server_url: &str, caption_chars: Option<u32>) -> AssemblyAiClient {
        AssemblyAiClient::new("test_api_key_123", server_url, Duration::from_secs(5), caption_chars)
            .unwrap()
    }

    fn job(id: &str) -> JobId {
        JobId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn submit_sends_source_and_webhook_urls() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/transcript")
            .match_header("authorization", "test_api_key_123")
            .match_body(Matcher::Json(serde_json::json!({
                "audio_url": "https://relay.example/artifact/src.mp3",
                "webhook_url": "https://relay.example/webhook"
            })))
            .with_status(200)
            .with_body(r#"{"id": "abc", "status": "queued"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let job_id = client
            .submit(
                "https://relay.example/artifact/src.mp3",
                Some("https://relay.example/webhook"),
            )
            .await
            .unwrap();

        assert_eq!(job_id, job("abc"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_without_webhook_omits_the_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/transcript")
            .match_body(Matcher::Json(serde_json::json!({
                "audio_url": "https://relay.example/artifact/src.mp3"
            })))
            .with_status(200)
            .with_body(r#"{"id": "abc", "status": "queued"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        client
            .submit("https://relay.example/artifact/src.mp3", None)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_rejection_carries_provider_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/transcript")
            .with_status(400)
            .with_body(r#"{"error": "Invalid audio_url"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let err = client.submit("not-a-url", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(ref msg) if msg == "Invalid audio_url"));
    }

    #[tokio::test]
    async fn upload_source_returns_provider_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("authorization", "test_api_key_123")
            .match_header("content-type", "application/octet-stream")
            .match_body("ID3 fake audio")
            .with_status(200)
            .with_body(r#"{"upload_url": "https://cdn.assemblyai.test/upload/f00d"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let url = client
            .upload_source(Bytes::from_static(b"ID3 fake audio"))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.assemblyai.test/upload/f00d");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_source_rejection_carries_provider_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/upload")
            .with_status(401)
            .with_body(r#"{"error": "Authentication error, API token missing/invalid"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let err = client.upload_source(Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(ref msg) if msg.starts_with("Authentication error")));
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/transcript/abc")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let err = client.status(&job("abc")).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn status_maps_error_object_to_variant() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/transcript/abc")
            .with_status(200)
            .with_body(r#"{"id": "abc", "status": "error", "error": "Download error, unable to download"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let status = client.status(&job("abc")).await.unwrap();
        assert_eq!(
            status,
            ReportedStatus::Error("Download error, unable to download".to_string())
        );
    }

    #[tokio::test]
    async fn status_reports_processing_and_unknown_as_non_terminal() {
        let mut server = Server::new_async().await;
        let _processing = server
            .mock("GET", "/transcript/abc")
            .with_body(r#"{"id": "abc", "status": "processing"}"#)
            .create_async()
            .await;
        let _unknown = server
            .mock("GET", "/transcript/def")
            .with_body(r#"{"id": "def", "status": "rebalancing"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        assert_eq!(client.status(&job("abc")).await.unwrap(), ReportedStatus::Processing);
        assert_eq!(client.status(&job("def")).await.unwrap(), ReportedStatus::Processing);
    }

    #[tokio::test]
    async fn unknown_transcript_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/transcript/missing")
            .with_status(404)
            .with_body(r#"{"error": "Transcript lookup error, transcript id not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let err = client.status(&job("missing")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn fetch_srt_passes_caption_width() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nHello there\n";
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/transcript/abc/srt")
            .match_query(Matcher::UrlEncoded("chars_per_caption".into(), "32".into()))
            .with_body(srt)
            .create_async()
            .await;

        let client = client_for(&server.url(), Some(32));
        let body = client.fetch_artifact(&job("abc"), ArtifactFormat::Srt).await.unwrap();
        assert_eq!(body, Bytes::from(srt));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_text_uses_transcript_text() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/transcript/abc")
            .with_body(r#"{"id": "abc", "status": "completed", "text": "Hello there"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let body = client.fetch_artifact(&job("abc"), ArtifactFormat::Text).await.unwrap();
        assert_eq!(body, Bytes::from("Hello there"));
    }
}

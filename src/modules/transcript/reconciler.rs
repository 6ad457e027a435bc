//! Job-completion reconciliation.
//!
//! Every completion signal, whether pushed by the provider's webhook or
//! discovered by a client poll, funnels into [`JobReconciler::on_completion_signal`].
//! This is the only place that fetches artifacts from the provider and writes
//! them to the store.

use super::keys::KeyAddressing;
use super::model::{
    ArtifactFormat, CompletionEvent, Job, JobId, JobState, Outcome, ReportedStatus, SourceDelivery,
};
use crate::common::error::AppError;
use crate::infrastructure::provider::{ProviderError, TranscriptionProvider};
use crate::infrastructure::redis::CompletionGuard;
use crate::infrastructure::storage::ArtifactStore;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub const WEBHOOK_PATH: &str = "/webhook";

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub public_base_url: Url,
    pub webhook_enabled: bool,
    pub format: ArtifactFormat,
    pub source_delivery: SourceDelivery,
    pub poll_interval: Duration,
    pub max_wait_attempts: u32,
}

pub struct JobReconciler {
    provider: Arc<dyn TranscriptionProvider>,
    store: Arc<dyn ArtifactStore>,
    guard: Option<Arc<dyn CompletionGuard>>,
    keys: KeyAddressing,
    settings: ReconcilerSettings,
}

impl JobReconciler {
    pub fn new(
        provider: Arc<dyn TranscriptionProvider>,
        store: Arc<dyn ArtifactStore>,
        keys: KeyAddressing,
        mut settings: ReconcilerSettings,
    ) -> Self {
        // Url::join drops the last path segment unless the base ends with '/'.
        if !settings.public_base_url.path().ends_with('/') {
            let path = format!("{}/", settings.public_base_url.path());
            settings.public_base_url.set_path(&path);
        }

        Self {
            provider,
            store,
            guard: None,
            keys,
            settings,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn CompletionGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    fn public_url(&self, path: &str) -> Result<Url, AppError> {
        self.settings
            .public_base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::SubmissionFailed(format!("Cannot build public URL for {}: {}", path, e)))
    }

    /// Delivers an uploaded source per the configured [`SourceDelivery`] and submits it.
    pub async fn submit_upload(
        &self,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<Job, AppError> {
        match self.settings.source_delivery {
            SourceDelivery::Store => {
                let source_key = self.keys.mint_source_key(file_name);
                self.store.put(&source_key, body, content_type).await?;
                info!("Stored source {} as {}", file_name, source_key);

                self.submit(&source_key).await
            }
            SourceDelivery::ProviderUpload => {
                let upload_url = self
                    .provider
                    .upload_source(body)
                    .await
                    .map_err(submission_error)?;
                info!("Uploaded source {} to the provider", file_name);

                self.submit_source(&upload_url, None).await
            }
        }
    }

    /// Hands a stored source to the provider. Returns as soon as the job is queued.
    pub async fn submit(&self, source_key: &str) -> Result<Job, AppError> {
        let source_url = self.public_url(&self.keys.artifact_path(source_key))?;
        self.submit_source(source_url.as_str(), Some(source_key)).await
    }

    async fn submit_source(&self, source_url: &str, source_key: Option<&str>) -> Result<Job, AppError> {
        let webhook_url = if self.settings.webhook_enabled {
            Some(self.public_url(WEBHOOK_PATH)?)
        } else {
            None
        };

        let job_id = self
            .provider
            .submit(source_url, webhook_url.as_ref().map(Url::as_str))
            .await
            .map_err(submission_error)?;

        let format = self.settings.format;
        let job = Job {
            artifact_key: self.keys.derive_artifact_key(&job_id, format),
            job_id,
            source_key: source_key.map(str::to_string),
            format,
            state: JobState::Submitted,
        };

        info!(
            "Submitted job {} for source {} (artifact {}, webhook: {})",
            job.job_id, source_url, job.artifact_key, self.settings.webhook_enabled
        );
        Ok(job)
    }

    pub async fn on_completion_signal(&self, event: CompletionEvent) -> Result<Outcome, AppError> {
        match event.status {
            ReportedStatus::Queued | ReportedStatus::Processing => {
                debug!("Job {} not finished yet", event.job_id);
                Ok(Outcome::Pending)
            }
            ReportedStatus::Error(message) => {
                warn!("Job {} failed: {}", event.job_id, message);
                Ok(Outcome::Failed(message))
            }
            ReportedStatus::Completed => self.publish_artifact(&event.job_id).await,
        }
    }

    async fn publish_artifact(&self, job_id: &JobId) -> Result<Outcome, AppError> {
        let format = self.settings.format;
        let artifact_key = self.keys.derive_artifact_key(job_id, format);

        if self.store.exists(&artifact_key).await? {
            debug!("Artifact {} already published, replay is a no-op", artifact_key);
            return Ok(Outcome::Ready(artifact_key));
        }

        if let Some(guard) = &self.guard {
            match guard.try_claim(job_id.as_str()).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Artifact for {} is being published by another signal", job_id);
                    return Ok(Outcome::Pending);
                }
                // Overwrites are idempotent, so a missing marker only costs a duplicate fetch.
                Err(e) => warn!("{}; publishing {} without a claim", e, job_id),
            }
        }

        match self.fetch_and_store(job_id, &artifact_key, format).await {
            Ok(()) => {
                info!("✅ Published artifact {}", artifact_key);
                Ok(Outcome::Ready(artifact_key))
            }
            Err(e) => {
                self.release_claim(job_id).await;
                Err(e)
            }
        }
    }

    async fn fetch_and_store(
        &self,
        job_id: &JobId,
        artifact_key: &str,
        format: ArtifactFormat,
    ) -> Result<(), AppError> {
        let body = self
            .provider
            .fetch_artifact(job_id, format)
            .await
            .map_err(|e| match e {
                ProviderError::Transient(msg) => AppError::TransientProvider(msg),
                other => AppError::Provider(other.to_string()),
            })?;

        self.store
            .put(artifact_key, body, format.content_type())
            .await?;
        Ok(())
    }

    async fn release_claim(&self, job_id: &JobId) {
        if let Some(guard) = &self.guard {
            if let Err(e) = guard.release(job_id.as_str()).await {
                warn!("Failed to release claim for {}: {}", job_id, e);
            }
        }
    }

    /// Blocks until the job reaches a terminal state, publishing the artifact on completion.
    ///
    /// For batch callers only; request handlers use one-shot polls instead. Gives up
    /// after `max_wait_attempts` status checks or as soon as `cancel` fires.
    pub async fn wait_for_completion(
        &self,
        job_id: &JobId,
        cancel: &CancellationToken,
    ) -> Result<Outcome, AppError> {
        let max_attempts = self.settings.max_wait_attempts.max(1);
        let mut state = JobState::Submitted;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled(job_id.to_string()));
            }

            let observed = tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled(job_id.to_string())),
                observed = self.provider.status(job_id) => observed,
            };

            match observed {
                Ok(status) => {
                    let next = state.advance(&status);
                    if next != state {
                        debug!("Job {}: {:?} -> {:?}", job_id, state, next);
                        state = next;
                    }

                    let event = CompletionEvent {
                        job_id: job_id.clone(),
                        status,
                    };
                    // An abandoned publish leaves at most a claim marker, which expires on its own.
                    let handled = tokio::select! {
                        _ = cancel.cancelled() => return Err(AppError::Cancelled(job_id.to_string())),
                        handled = self.on_completion_signal(event) => handled,
                    };

                    match handled {
                        Ok(Outcome::Pending) => {}
                        Ok(outcome) => return Ok(outcome),
                        Err(AppError::TransientProvider(msg)) => {
                            warn!("Transient failure publishing {}: {}", job_id, msg)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(ProviderError::Transient(msg)) => {
                    warn!("Status check {} for {} failed: {}", attempt, job_id, msg)
                }
                Err(ProviderError::NotFound(msg)) => return Err(AppError::JobNotFound(msg)),
                Err(e) => return Err(AppError::Provider(e.to_string())),
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AppError::Cancelled(job_id.to_string())),
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                }
            }
        }

        Err(AppError::WaitExhausted {
            job_id: job_id.to_string(),
            attempts: max_attempts,
        })
    }
}

fn submission_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::Transient(msg) => AppError::TransientProvider(msg),
        other => AppError::SubmissionFailed(other.to_string()),
    }
}

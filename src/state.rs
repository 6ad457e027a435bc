use crate::config::settings::{AppConfig, StorageBackend};
use crate::infrastructure::provider::{AssemblyAiClient, TranscriptionProvider};
use crate::infrastructure::redis::client::RedisService;
use crate::infrastructure::storage::{ArtifactStore, MemoryStore, StorageService};
use crate::modules::transcript::keys::KeyAddressing;
use crate::modules::transcript::reconciler::{JobReconciler, ReconcilerSettings};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub keys: KeyAddressing,
    pub store: Arc<dyn ArtifactStore>,
    pub provider: Arc<dyn TranscriptionProvider>,
    pub reconciler: Arc<JobReconciler>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ArtifactStore>,
        provider: Arc<dyn TranscriptionProvider>,
        reconciler: JobReconciler,
    ) -> Self {
        Self {
            config,
            keys: KeyAddressing::new(),
            store,
            provider,
            reconciler: Arc::new(reconciler),
        }
    }

    /// Wires the real collaborators described by `config`.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ArtifactStore> = match (config.storage_backend, &config.s3) {
            (StorageBackend::S3, Some(s3)) => {
                info!("Using S3 bucket {} at {}", s3.bucket, s3.endpoint);
                Arc::new(StorageService::new(s3))
            }
            (StorageBackend::S3, None) => anyhow::bail!("S3 storage selected without S3 settings"),
            (StorageBackend::Memory, _) => {
                warn!("Using in-memory storage; artifacts are lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let provider: Arc<dyn TranscriptionProvider> = Arc::new(
            AssemblyAiClient::new(
                &config.assemblyai_api_key,
                &config.assemblyai_base_url,
                config.provider_timeout,
                config.caption_chars,
            )
            .context("Failed to build AssemblyAI client")?,
        );

        let mut reconciler = JobReconciler::new(
            provider.clone(),
            store.clone(),
            KeyAddressing::new(),
            reconciler_settings(&config),
        );

        if let Some(url) = &config.redis_url {
            let redis = RedisService::new(url, config.claim_ttl)
                .await
                .context("Failed to connect to Redis")?;
            reconciler = reconciler.with_guard(Arc::new(redis));
        }

        Ok(Self::new(config, store, provider, reconciler))
    }
}

pub fn reconciler_settings(config: &AppConfig) -> ReconcilerSettings {
    ReconcilerSettings {
        public_base_url: config.public_base_url.clone(),
        webhook_enabled: config.webhook_enabled,
        format: config.artifact_format,
        source_delivery: config.source_delivery,
        poll_interval: config.poll_interval,
        max_wait_attempts: config.wait_max_attempts,
    }
}

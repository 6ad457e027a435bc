use std::env;

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    PublicBaseUrl,
    AssemblyAiApiKey,
    AssemblyAiBaseUrl,
    WebhookEnabled,
    PollIntervalSecs,
    WaitMaxAttempts,
    ArtifactFormat,
    CaptionChars,
    ProviderTimeoutSecs,
    StorageBackend,
    SourceDelivery,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    RedisUrl,
    ClaimTtlSecs,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::PublicBaseUrl => "PUBLIC_BASE_URL",
            EnvKey::AssemblyAiApiKey => "ASSEMBLYAI_API_KEY",
            EnvKey::AssemblyAiBaseUrl => "ASSEMBLYAI_BASE_URL",
            EnvKey::WebhookEnabled => "WEBHOOK_ENABLED",
            EnvKey::PollIntervalSecs => "POLL_INTERVAL_SECS",
            EnvKey::WaitMaxAttempts => "WAIT_MAX_ATTEMPTS",
            EnvKey::ArtifactFormat => "ARTIFACT_FORMAT",
            EnvKey::CaptionChars => "CAPTION_CHARS",
            EnvKey::ProviderTimeoutSecs => "PROVIDER_TIMEOUT_SECS",
            EnvKey::StorageBackend => "STORAGE_BACKEND",
            EnvKey::SourceDelivery => "SOURCE_DELIVERY",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_TRANSCRIPTS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::ClaimTtlSecs => "CLAIM_TTL_SECS",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

/// Treats an unset or blank variable as absent.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str())
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Accepts the usual spellings of a boolean flag.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use crate::config::env::{self, EnvKey};
use crate::modules::transcript::model::{ArtifactFormat, SourceDelivery};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com/v2";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "minio" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Connection details for the S3/MinIO bucket holding sources and artifacts.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    /// Externally reachable origin; source and webhook URLs handed to the provider hang off it.
    pub public_base_url: Url,
    pub assemblyai_api_key: String,
    pub assemblyai_base_url: String,
    pub webhook_enabled: bool,
    pub source_delivery: SourceDelivery,
    pub poll_interval: Duration,
    pub wait_max_attempts: u32,
    pub artifact_format: ArtifactFormat,
    pub caption_chars: Option<u32>,
    pub provider_timeout: Duration,
    pub storage_backend: StorageBackend,
    pub s3: Option<S3Settings>,
    pub redis_url: Option<String>,
    pub claim_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(env::get_opt)
    }

    /// Builds the config from any key lookup. Unset or blank keys take their
    /// default; set keys must parse.
    pub fn from_lookup(lookup: impl Fn(EnvKey) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let storage_backend = vars.parsed_or(EnvKey::StorageBackend, StorageBackend::S3)?;
        let s3 = match storage_backend {
            StorageBackend::S3 => Some(S3Settings {
                endpoint: vars.required(EnvKey::MinioUrl)?,
                bucket: vars.required(EnvKey::MinioBucket)?,
                access_key: vars.required(EnvKey::MinioAccessKey)?,
                secret_key: vars.required(EnvKey::MinioSecretKey)?,
            }),
            StorageBackend::Memory => None,
        };

        Ok(Self {
            server_port: vars.parsed_or(EnvKey::ServerPort, 3000)?,
            public_base_url: vars.parsed_or(
                EnvKey::PublicBaseUrl,
                Url::parse(DEFAULT_PUBLIC_BASE_URL).map_err(|_| ConfigError::Invalid {
                    key: EnvKey::PublicBaseUrl.as_str(),
                    value: DEFAULT_PUBLIC_BASE_URL.to_string(),
                })?,
            )?,
            assemblyai_api_key: vars.required(EnvKey::AssemblyAiApiKey)?,
            assemblyai_base_url: vars
                .get(EnvKey::AssemblyAiBaseUrl)
                .unwrap_or_else(|| DEFAULT_ASSEMBLYAI_BASE_URL.to_string()),
            webhook_enabled: vars.flag_or(EnvKey::WebhookEnabled, true)?,
            source_delivery: vars.parsed_or(EnvKey::SourceDelivery, SourceDelivery::Store)?,
            poll_interval: vars.positive_secs(EnvKey::PollIntervalSecs, 3)?,
            wait_max_attempts: vars.positive(EnvKey::WaitMaxAttempts, 200)?,
            artifact_format: vars.parsed_or(EnvKey::ArtifactFormat, ArtifactFormat::Srt)?,
            caption_chars: vars
                .get(EnvKey::CaptionChars)
                .map(|raw| parse_required(EnvKey::CaptionChars, &raw))
                .transpose()?,
            provider_timeout: vars.positive_secs(EnvKey::ProviderTimeoutSecs, 30)?,
            storage_backend,
            s3,
            redis_url: vars.get(EnvKey::RedisUrl),
            claim_ttl: vars.positive_secs(EnvKey::ClaimTtlSecs, 60)?,
            max_upload_bytes: vars.positive(EnvKey::MaxUploadBytes, 512 * 1024 * 1024)?,
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(EnvKey) -> Option<String>> Vars<F> {
    fn get(&self, key: EnvKey) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: EnvKey) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key.as_str()))
    }

    fn parsed_or<T: FromStr>(&self, key: EnvKey, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => parse_required(key, &raw),
            None => Ok(default),
        }
    }

    fn flag_or(&self, key: EnvKey, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(raw) => env::parse_flag(&raw).ok_or(ConfigError::Invalid {
                key: key.as_str(),
                value: raw,
            }),
            None => Ok(default),
        }
    }

    fn positive<T: FromStr + PartialEq + Default>(&self, key: EnvKey, default: T) -> Result<T, ConfigError> {
        let value = self.parsed_or(key, default)?;
        if value == T::default() {
            return Err(ConfigError::Invalid {
                key: key.as_str(),
                value: "0".to_string(),
            });
        }
        Ok(value)
    }

    fn positive_secs(&self, key: EnvKey, default: u64) -> Result<Duration, ConfigError> {
        self.positive(key, default).map(Duration::from_secs)
    }
}

fn parse_required<T: FromStr>(key: EnvKey, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key: key.as_str(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn storage_backend_accepts_known_names() {
        assert_eq!("s3".parse::<StorageBackend>(), Ok(StorageBackend::S3));
        assert_eq!("MinIO".parse::<StorageBackend>(), Ok(StorageBackend::S3));
        assert_eq!(" memory ".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("disk".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn parse_required_reports_offending_key() {
        let err = parse_required::<u32>(EnvKey::CaptionChars, "lots").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value \"lots\" for CAPTION_CHARS"
        );
    }

    fn lookup(pairs: &[(EnvKey, &str)]) -> impl Fn(EnvKey) -> Option<String> {
        let vars: HashMap<&'static str, String> = pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.to_string()))
            .collect();
        move |key| vars.get(key.as_str()).cloned()
    }

    fn minimal() -> Vec<(EnvKey, &'static str)> {
        vec![
            (EnvKey::AssemblyAiApiKey, "key"),
            (EnvKey::StorageBackend, "memory"),
        ]
    }

    fn with(extra: (EnvKey, &'static str)) -> Result<AppConfig, ConfigError> {
        let mut pairs = minimal();
        pairs.push(extra);
        AppConfig::from_lookup(lookup(&pairs))
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&minimal())).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.public_base_url.as_str(), "http://localhost:3000/");
        assert!(config.webhook_enabled);
        assert_eq!(config.source_delivery, SourceDelivery::Store);
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.wait_max_attempts, 200);
        assert_eq!(config.artifact_format, ArtifactFormat::Srt);
        assert!(config.s3.is_none());
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[(EnvKey::StorageBackend, "memory")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ASSEMBLYAI_API_KEY")));
    }

    #[test]
    fn s3_backend_requires_bucket_settings() {
        let err = AppConfig::from_lookup(lookup(&[(EnvKey::AssemblyAiApiKey, "key")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("MINIO_ENDPOINT")));
    }

    #[test]
    fn misspelled_flag_is_rejected() {
        let err = with((EnvKey::WebhookEnabled, "flase")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WEBHOOK_ENABLED", .. }));

        assert!(!with((EnvKey::WebhookEnabled, "off")).unwrap().webhook_enabled);
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let err = with((EnvKey::PollIntervalSecs, "abc")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_INTERVAL_SECS", .. }));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = with((EnvKey::PollIntervalSecs, "0")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLL_INTERVAL_SECS", .. }));
    }

    #[test]
    fn zero_wait_attempts_are_rejected() {
        let err = with((EnvKey::WaitMaxAttempts, "0")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WAIT_MAX_ATTEMPTS", .. }));
    }

    #[test]
    fn unknown_storage_backend_is_rejected() {
        let err = with((EnvKey::StorageBackend, "disk")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORAGE_BACKEND", .. }));
    }

    #[test]
    fn source_delivery_is_read() {
        let config = with((EnvKey::SourceDelivery, "provider_upload")).unwrap();
        assert_eq!(config.source_delivery, SourceDelivery::ProviderUpload);
    }
}

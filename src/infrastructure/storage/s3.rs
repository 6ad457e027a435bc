use super::{ArtifactStore, StoreError, StoredObject};
use crate::config::settings::S3Settings;
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::{debug, info};

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
}

impl StorageService {
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "static",
        );

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url(&settings.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(config);

        info!("✅ Configured S3 bucket {} at {}", settings.bucket, settings.endpoint);

        Self {
            client,
            bucket: settings.bucket.clone(),
        }
    }
}

#[async_trait]
impl ArtifactStore for StorageService {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError> {
        debug!("⬆️ Writing {} bytes to s3://{}/{}", body.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to put {}: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                return match e.into_service_error() {
                    GetObjectError::NoSuchKey(_) => Ok(None),
                    other => Err(StoreError::Backend(format!("Failed to get {}: {}", key, other))),
                };
            }
        };

        let content_type = resp.content_type().map(str::to_string);
        let etag = resp.e_tag().map(str::to_string);

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to read body of {}: {}", key, e)))?
            .into_bytes();

        Ok(Some(StoredObject {
            body,
            content_type,
            etag,
        }))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.into_service_error() {
                HeadObjectError::NotFound(_) => Ok(false),
                other => Err(StoreError::Backend(format!("Failed to stat {}: {}", key, other))),
            },
        }
    }
}

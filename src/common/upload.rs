use crate::common::error::AppError;
use axum::extract::{Multipart, multipart::Field};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::{error, info};

/// Name of the multipart field carrying the media file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Pulls the `file` field out of a multipart form, buffering it in memory.
pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some(FILE_FIELD) {
            return collect_field(field).await;
        }
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}

async fn collect_field(mut field: Field<'_>) -> Result<UploadedFile, AppError> {
    let file_name = field.file_name().unwrap_or(FILE_FIELD).to_string();
    let content_type = field
        .content_type()
        .map(str::to_string)
        .filter(|ct| ct != mime::APPLICATION_OCTET_STREAM.essence_str())
        .unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .to_string()
        });

    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            error!("Stream error: {}", e);
            AppError::BadRequest("Upload stream interrupted".to_string())
        })?;
        buffer.extend_from_slice(&chunk);
    }

    info!("Received upload {} ({} bytes, {})", file_name, buffer.len(), content_type);

    Ok(UploadedFile {
        file_name,
        content_type,
        body: buffer.freeze(),
    })
}

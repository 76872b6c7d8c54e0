use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use media_reference::{sanitize_folder, CanonicalKey, KeyError};
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::{
    media_storage::{BucketError, MediaStorage},
    types::AppError,
};

/// Largest accepted file, 50 MiB
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Request body limit for the upload route; leaves room for multipart framing
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_SIZE + 1024 * 1024;

/// MIME types accepted for upload
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    // Audio
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/ogg",
    // Video
    "video/mp4",
    "video/webm",
    // Documents
    "application/pdf",
];

const NONCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const NONCE_LEN: usize = 6;

/// Reasons an upload is rejected
#[derive(Debug, Error)]
pub enum UploadError {
    /// The form has no `file` field
    #[error("No file provided")]
    NoFile,

    /// The file part carries no usable name
    #[error("Invalid file name")]
    InvalidFileName,

    /// Content type outside the allow-list
    #[error("File type not allowed: {0}")]
    DisallowedType(String),

    /// File larger than [`MAX_UPLOAD_SIZE`]
    #[error("File too large (max {} MiB)", MAX_UPLOAD_SIZE / 1024 / 1024)]
    TooLarge,

    /// The multipart body could not be read
    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    /// Storing the object failed
    #[error(transparent)]
    Storage(#[from] BucketError),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Malformed(err.body_text())
        }
    }
}

impl From<KeyError> for UploadError {
    fn from(_: KeyError) -> Self {
        Self::InvalidFileName
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Storage(err) => err.into(),
            UploadError::Malformed(details) => {
                Self::new(StatusCode::BAD_REQUEST, "Malformed multipart body").with_details(details)
            }
            other => Self::new(StatusCode::BAD_REQUEST, other.to_string()),
        }
    }
}

/// Response of a successful upload
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always `true`
    pub success: bool,
    /// Public URL of the stored object; reads should still go through `/api/download`
    pub url: String,
    /// Canonical key to persist on the content record
    pub key: String,
    /// Stored file name, `<timestamp_ms>-<random>-<sanitized name>`
    pub file_name: String,
    /// File name as sent by the client
    pub original_name: String,
    /// Size in bytes
    pub size: usize,
    /// Content type of the stored object
    #[serde(rename = "type")]
    pub content_type: String,
}

struct FilePart {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

/// Folder an upload lands in when the caller gives none
#[must_use]
pub fn default_folder(content_type: &mime::Mime) -> &'static str {
    let top = content_type.type_();
    if top == mime::IMAGE {
        "images"
    } else if top == mime::AUDIO {
        "audio"
    } else if top == mime::VIDEO {
        "videos"
    } else if top == mime::APPLICATION && content_type.subtype() == mime::PDF {
        "documents"
    } else {
        "general"
    }
}

fn random_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..NONCE_LEN)
        .map(|_| char::from(NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())]))
        .collect()
}

async fn read_form(multipart: &mut Multipart) -> Result<(Option<FilePart>, Option<String>), UploadError> {
    let mut file = None;
    let mut folder = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await?;

                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(UploadError::TooLarge);
                }

                file = Some(FilePart {
                    name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "folder" => folder = Some(field.text().await?),
            _ => {}
        }
    }

    Ok((file, folder))
}

/// Uploads a media file to object storage
///
/// Expects a multipart form with a `file` part and an optional `folder` hint.
/// The object is stored under `uploads/<folder>/<timestamp_ms>-<random>-<name>`
/// with a long-lived immutable cache header; the returned `key` is what content
/// records should persist.
///
/// # Errors
///
/// - 400 for a missing file, a disallowed type or a file over 50 MiB
/// - 503 if storage is not configured
/// - 500 if storing the object fails
#[instrument(skip(media_storage, multipart))]
pub async fn upload(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (file, folder) = read_form(&mut multipart).await?;
    let file = file.ok_or(UploadError::NoFile)?;

    let content_type: mime::Mime = file
        .content_type
        .parse()
        .map_err(|_| UploadError::DisallowedType(file.content_type.clone()))?;
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.essence_str()) {
        return Err(UploadError::DisallowedType(file.content_type).into());
    }

    let folder = folder
        .as_deref()
        .and_then(sanitize_folder)
        .unwrap_or_else(|| default_folder(&content_type).to_string());

    let key = CanonicalKey::for_upload(
        &folder,
        Utc::now().timestamp_millis(),
        &random_nonce(),
        &file.name,
    )
    .map_err(UploadError::from)?;

    let size = file.data.len();
    media_storage
        .put_object(&key, file.data, content_type.essence_str())
        .await
        .map_err(UploadError::from)?;

    let url = media_storage.public_url(&key)?;

    tracing::info!("Uploaded {} as {key}", file.name);

    Ok(Json(UploadResponse {
        success: true,
        url,
        file_name: key.file_name().to_string(),
        key: key.into_inner(),
        original_name: file.name,
        size,
        content_type: content_type.essence_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_folder() {
        let folder = |value: &str| default_folder(&value.parse().unwrap());

        assert_eq!(folder("image/webp"), "images");
        assert_eq!(folder("audio/mpeg"), "audio");
        assert_eq!(folder("video/mp4"), "videos");
        assert_eq!(folder("application/pdf"), "documents");
        assert_eq!(folder("application/zip"), "general");
    }

    #[test]
    fn test_random_nonce_is_base36() {
        let nonce = random_nonce();

        assert_eq!(nonce.len(), NONCE_LEN);
        assert!(nonce
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_upload_error_status() {
        let status = |err: UploadError| AppError::from(err).status();

        assert_eq!(status(UploadError::NoFile), StatusCode::BAD_REQUEST);
        assert_eq!(status(UploadError::TooLarge), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(UploadError::DisallowedType("text/html".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(UploadError::Storage(BucketError::NotConfigured)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(UploadError::Storage(BucketError::S3Error("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

//! S3-compatible media storage: signed downloads and uploads
mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client as S3Client};
use chrono::{DateTime, Utc};
use media_reference::CanonicalKey;
use tracing::{debug, info};
use url::Url;

pub use config::{StorageConfig, DEFAULT_REGION};
pub use error::{BucketError, BucketResult};

/// Validity window of signed download URLs
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 60 * 60;

/// Cache header stored on uploaded objects, which are never rewritten
pub const UPLOADED_OBJECT_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Presigned URL with expiration information
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL for GET operations
    pub url: String,
    /// ISO-8601 UTC timestamp when the URL expires
    pub expires_at: DateTime<Utc>,
}

struct Bucket {
    s3_client: Arc<S3Client>,
    bucket_name: String,
    public_base: String,
}

/// Media storage client for S3 operations.
///
/// Holds no bucket when storage is not configured; every operation then returns
/// `BucketError::NotConfigured`.
pub struct MediaStorage {
    bucket: Option<Bucket>,
    presigned_url_expiry_secs: u64,
}

impl MediaStorage {
    /// Creates a media storage client for a configured bucket
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket holding uploaded media
    /// * `public_base` - Base URL object keys are appended to for public URLs
    /// * `presigned_url_expiry_secs` - Validity of signed download URLs
    #[must_use]
    pub const fn new(
        s3_client: Arc<S3Client>,
        bucket_name: String,
        public_base: String,
        presigned_url_expiry_secs: u64,
    ) -> Self {
        Self {
            bucket: Some(Bucket {
                s3_client,
                bucket_name,
                public_base,
            }),
            presigned_url_expiry_secs,
        }
    }

    /// Creates a client that reports "not configured" for every operation
    #[must_use]
    pub const fn unconfigured(presigned_url_expiry_secs: u64) -> Self {
        Self {
            bucket: None,
            presigned_url_expiry_secs,
        }
    }

    /// Builds the S3 client from `config`, or an unconfigured storage if there is none
    pub async fn from_config(config: Option<&StorageConfig>, presigned_url_expiry_secs: u64) -> Self {
        let Some(config) = config else {
            return Self::unconfigured(presigned_url_expiry_secs);
        };

        let s3_client = Arc::new(S3Client::from_conf(config.s3_client_config().await));

        info!(
            "Initialized S3 storage client for bucket: {} at {}",
            config.bucket, config.endpoint
        );

        Self::new(
            s3_client,
            config.bucket.clone(),
            config.public_base(),
            presigned_url_expiry_secs,
        )
    }

    /// Whether storage credentials were provided
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.bucket.is_some()
    }

    /// Validity of signed download URLs, in seconds
    #[must_use]
    pub const fn presigned_url_expiry_secs(&self) -> u64 {
        self.presigned_url_expiry_secs
    }

    fn bucket(&self) -> BucketResult<&Bucket> {
        self.bucket.as_ref().ok_or(BucketError::NotConfigured)
    }

    /// Generates a presigned URL granting read access to a single object
    ///
    /// # Arguments
    ///
    /// * `key` - Canonical key of the object
    ///
    /// # Returns
    ///
    /// A `PresignedUrl` struct containing the URL and expiration time
    ///
    /// # Errors
    ///
    /// Returns `BucketError::NotConfigured` if storage credentials are absent
    /// Returns `BucketError::ConfigError` if presigning config creation fails
    /// Returns `BucketError::S3Error` if presigned URL generation fails
    pub async fn sign_download(&self, key: &CanonicalKey) -> BucketResult<PresignedUrl> {
        let bucket = self.bucket()?;

        let presigned_config =
            PresigningConfig::expires_in(Duration::from_secs(self.presigned_url_expiry_secs))
                .map_err(|e| {
                    BucketError::ConfigError(format!("Failed to create presigning config: {e}"))
                })?;

        let presigned_request = bucket
            .s3_client
            .get_object()
            .bucket(&bucket.bucket_name)
            .key(key.as_str())
            .presigned(presigned_config)
            .await?;

        let expires_at: DateTime<Utc> =
            Utc::now() + Duration::from_secs(self.presigned_url_expiry_secs);

        debug!("Generated presigned URL for object: {key} expires at: {expires_at}");

        Ok(PresignedUrl {
            url: presigned_request.uri().to_string(),
            expires_at,
        })
    }

    /// Stores an uploaded object under `key`
    ///
    /// # Errors
    ///
    /// Returns `BucketError::NotConfigured` if storage credentials are absent
    /// Returns `BucketError::UpstreamError` for 5xx errors
    /// Returns `BucketError::S3Error` or `BucketError::AwsError` for any other failure
    pub async fn put_object(
        &self,
        key: &CanonicalKey,
        body: Vec<u8>,
        content_type: &str,
    ) -> BucketResult<()> {
        let bucket = self.bucket()?;
        let size = body.len();

        bucket
            .s3_client
            .put_object()
            .bucket(&bucket.bucket_name)
            .key(key.as_str())
            .body(ByteStream::from(body))
            .content_type(content_type)
            .cache_control(UPLOADED_OBJECT_CACHE_CONTROL)
            .send()
            .await?;

        info!("Stored object {key} ({size} bytes, {content_type})");

        Ok(())
    }

    /// Public URL of an object, each key segment percent-encoded
    ///
    /// # Errors
    ///
    /// Returns `BucketError::NotConfigured` if storage credentials are absent
    /// Returns `BucketError::ConfigError` if the public base is not a valid URL
    pub fn public_url(&self, key: &CanonicalKey) -> BucketResult<String> {
        let bucket = self.bucket()?;
        public_url(&bucket.public_base, key)
    }
}

fn public_url(base: &str, key: &CanonicalKey) -> BucketResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| BucketError::ConfigError(format!("Invalid public URL base {base}: {e}")))?;

    url.path_segments_mut()
        .map_err(|()| BucketError::ConfigError(format!("Public URL base cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(key.as_str().split('/'));

    Ok(url.to_string())
}

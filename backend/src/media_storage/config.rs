//! Object-store connection settings

use std::env;
use std::fmt;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;

/// Region used when `B2_REGION` is not set
pub const DEFAULT_REGION: &str = "us-east-1";

/// Everything needed to talk to the S3-compatible object store.
///
/// Built once at startup. Its absence is the single "storage not configured"
/// condition: pages then render placeholders instead of failing.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// S3 endpoint, e.g. `https://s3.us-west-004.backblazeb2.com`
    pub endpoint: String,
    /// Signing region
    pub region: String,
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket holding every uploaded object
    pub bucket: String,
    /// Public base for object URLs, e.g. `https://f004.backblazeb2.com/file/<bucket>`
    pub public_url_base: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("public_url_base", &self.public_url_base)
            .finish()
    }
}

impl StorageConfig {
    /// Reads `B2_*` variables from the process environment
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup.
    ///
    /// Returns `None` if the endpoint, either credential or the bucket is missing or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Some(Self {
            endpoint: var("B2_S3_ENDPOINT")?.trim_end_matches('/').to_string(),
            region: var("B2_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key_id: var("B2_KEY_ID")?,
            secret_access_key: var("B2_APPLICATION_KEY")?,
            bucket: var("B2_BUCKET")?,
            public_url_base: var("B2_PUBLIC_URL_BASE")
                .map(|base| base.trim_end_matches('/').to_string()),
        })
    }

    /// Host of the S3 endpoint, lowercased
    #[must_use]
    pub fn endpoint_host(&self) -> Option<String> {
        url::Url::parse(&self.endpoint)
            .ok()?
            .host_str()
            .map(str::to_ascii_lowercase)
    }

    /// Base that object keys are appended to for public URLs
    #[must_use]
    pub fn public_base(&self) -> String {
        self.public_url_base
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.endpoint, self.bucket))
    }

    /// S3 client configuration.
    ///
    /// Static credentials, path-style addressing (Backblaze endpoints are more
    /// predictable with it) and a single attempt per operation.
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let credentials = Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            None,
            None,
            "storage-config",
        );

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .endpoint_url(&self.endpoint)
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeout_config)
            .load()
            .await;

        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();
        builder.set_force_path_style(Some(true));
        builder.build()
    }
}

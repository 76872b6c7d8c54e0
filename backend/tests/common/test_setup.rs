use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    media_storage::{MediaStorage, StorageConfig, DEFAULT_REGION, DEFAULT_SIGNED_URL_EXPIRY_SECS},
    middleware::UploadAuth,
    server::{self, AppDependencies},
    types::Environment,
};
use tower::ServiceExt;

use super::utils::MultipartForm;

/// Bearer token accepted by the test router's upload route
pub const TEST_UPLOAD_TOKEN: &str = "test-upload-token";

/// Bucket used against LocalStack
pub const TEST_BUCKET: &str = "minbar-media";

/// LocalStack endpoint
pub const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Storage settings pointing at LocalStack with its dummy credentials.
///
/// Presigning happens locally, so tests that only sign URLs do not need
/// LocalStack to be running.
pub fn localstack_storage_config() -> StorageConfig {
    StorageConfig {
        endpoint: LOCALSTACK_ENDPOINT.to_string(),
        region: DEFAULT_REGION.to_string(),
        access_key_id: "test".to_string(),
        secret_access_key: "test".to_string(),
        bucket: TEST_BUCKET.to_string(),
        public_url_base: None,
    }
}

/// Knobs of a [`TestSetup`]; the default is a development router backed by
/// LocalStack with token-protected uploads
pub struct TestOptions {
    pub storage: Option<StorageConfig>,
    pub upload_auth: UploadAuth,
    pub environment: Environment,
    pub signed_url_expiry_secs: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            storage: Some(localstack_storage_config()),
            upload_auth: UploadAuth::Token(TEST_UPLOAD_TOKEN.to_string()),
            environment: Environment::Development {
                signed_url_expiry_override: None,
            },
            signed_url_expiry_secs: DEFAULT_SIGNED_URL_EXPIRY_SECS,
        }
    }
}

/// Base test setup with core dependencies
pub struct TestSetup {
    pub router: Router,
    pub environment: Environment,
    pub media_storage: Arc<MediaStorage>,
}

impl TestSetup {
    /// Router backed by LocalStack storage, uploads require [`TEST_UPLOAD_TOKEN`]
    pub async fn new() -> Self {
        Self::build(TestOptions::default()).await
    }

    /// Router without storage credentials
    pub async fn unconfigured() -> Self {
        Self::with(None, UploadAuth::Token(TEST_UPLOAD_TOKEN.to_string())).await
    }

    pub async fn with(storage: Option<StorageConfig>, upload_auth: UploadAuth) -> Self {
        Self::build(TestOptions {
            storage,
            upload_auth,
            ..TestOptions::default()
        })
        .await
    }

    pub async fn build(options: TestOptions) -> Self {
        setup_test_env();

        let TestOptions {
            storage,
            upload_auth,
            environment,
            signed_url_expiry_secs,
        } = options;

        let media_storage = Arc::new(
            MediaStorage::from_config(storage.as_ref(), signed_url_expiry_secs).await,
        );
        let key_normalizer = Arc::new(environment.key_normalizer(storage.as_ref()));

        let router = server::router(
            environment.clone(),
            AppDependencies {
                media_storage: media_storage.clone(),
                key_normalizer,
                upload_auth,
            },
        );

        Self {
            router,
            environment,
            media_storage,
        }
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_upload_request(
        &self,
        form: MultipartForm,
        token: Option<&str>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut request = Request::builder()
            .uri("/api/upload")
            .method("POST")
            .header("Content-Type", form.content_type());

        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let request = request.body(Body::from(form.into_body()))?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }
}

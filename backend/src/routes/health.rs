use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;

use crate::media_storage::MediaStorage;

/// Health check response
#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    status: String,
    /// Current version of the application
    semver: String,
    /// Commit hash of the current build (if available)
    rev: Option<String>,
    /// Whether object storage credentials are configured
    storage_configured: bool,
}

/// Health check endpoint
///
/// Returns the current status and version information of the service.
/// This endpoint can be used for monitoring and deployment verification.
pub async fn handler(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
) -> impl IntoApiResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        rev: option_env!("GIT_REV").map(ToString::to_string),
        storage_configured: media_storage.is_configured(),
    })
}

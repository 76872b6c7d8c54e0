//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::media_storage::BucketError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Underlying cause, when there is one worth reporting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                error: error.into(),
                details: None,
            },
        }
    }

    /// Attaches the underlying cause to the response body
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.inner.details = Some(details.into());
        self
    }

    /// Status code the error is reported with
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = self.inner.details.as_deref().unwrap_or_default();

        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {} {details}", self.inner.error),
            500..=599 => tracing::error!("Server error: {} {details}", self.inner.error),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert bucket errors to application errors
impl From<BucketError> for AppError {
    fn from(err: BucketError) -> Self {
        match err {
            BucketError::NotConfigured => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Object storage is not configured",
            ),
            BucketError::UpstreamError(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage service unavailable")
                    .with_details(msg)
            }
            BucketError::S3Error(msg) | BucketError::AwsError(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage operation failed")
                    .with_details(msg)
            }
            BucketError::ConfigError(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage misconfigured")
                    .with_details(msg)
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

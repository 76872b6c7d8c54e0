use std::sync::Arc;

use aide::OperationOutput;
use axum::{
    extract::Query,
    http::{
        header::{CACHE_CONTROL, LOCATION},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use media_reference::{KeyNormalizer, NormalizedReference};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    media_storage::{BucketError, MediaStorage},
    types::AppError,
};

/// Cache header honoured by CDNs in front of the endpoint
pub const CDN_CACHE_CONTROL: HeaderName = HeaderName::from_static("cdn-cache-control");

/// Query of `GET /api/download`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadQuery {
    /// Stored media reference: a canonical `uploads/...` key, a persisted
    /// download URL, a native storage URL or a pass-through URL
    pub key: Option<String>,
    /// `json` returns the URL in the body, anything else redirects
    pub format: Option<String>,
}

/// Body of JSON-mode download responses
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DownloadUrlResponse {
    /// URL to fetch the media from, `null` when storage is not configured
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Json,
    Redirect,
}

impl Delivery {
    fn from_format(format: Option<&str>) -> Self {
        if format == Some("json") {
            Self::Json
        } else {
            Self::Redirect
        }
    }
}

/// Outcome of a download request
#[derive(Debug)]
pub enum DownloadResponse {
    /// Storage is not configured, the client renders a placeholder
    Unavailable,
    /// `200 {"url": ...}`
    Json {
        /// Resolved URL
        url: String,
        /// Cache lifetime in seconds, for signed URLs only
        max_age: Option<u64>,
    },
    /// `302 Location: ...`
    Redirect {
        /// Resolved URL
        location: String,
        /// Cache lifetime in seconds, for signed URLs only
        max_age: Option<u64>,
    },
}

impl DownloadResponse {
    fn deliver(delivery: Delivery, url: String, max_age: Option<u64>) -> Self {
        match delivery {
            Delivery::Json => Self::Json { url, max_age },
            Delivery::Redirect => Self::Redirect {
                location: url,
                max_age,
            },
        }
    }
}

fn with_cache_headers(mut response: Response, max_age: Option<u64>) -> Response {
    let Some(max_age) = max_age else {
        return response;
    };

    let headers = response.headers_mut();
    if let Ok(value) = format!("public, max-age={max_age}").parse() {
        headers.insert(CACHE_CONTROL, value);
    }
    if let Ok(value) = format!("max-age={max_age}").parse() {
        headers.insert(CDN_CACHE_CONTROL, value);
    }
    response
}

impl IntoResponse for DownloadResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Unavailable => Json(DownloadUrlResponse { url: None }).into_response(),
            Self::Json { url, max_age } => with_cache_headers(
                Json(DownloadUrlResponse { url: Some(url) }).into_response(),
                max_age,
            ),
            Self::Redirect { location, max_age } => with_cache_headers(
                (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
                max_age,
            ),
        }
    }
}

impl OperationOutput for DownloadResponse {
    type Inner = DownloadUrlResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<DownloadUrlResponse>::operation_response(ctx, operation)
    }
}

/// Resolves a stored media reference to a fetchable URL
///
/// The reference is normalized once, here:
/// - pass-through URLs are returned as they are, without signing; redirects only
///   go to local assets and native storage hosts, anything else is answered
///   with `200 {"url": ...}`
/// - canonical keys get a short-lived signed URL, cacheable for as long as it is valid
/// - without storage configuration the answer is `{"url": null}` so pages degrade
///   to placeholders instead of failing
///
/// # Errors
///
/// - 400 if `key` is missing, empty or not a recognizable media reference
/// - 500 if signing fails
#[instrument(skip(media_storage, normalizer, query))]
pub async fn download(
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Extension(normalizer): Extension<Arc<KeyNormalizer>>,
    Query(query): Query<DownloadQuery>,
) -> Result<DownloadResponse, AppError> {
    let reference = query
        .key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, "Missing key parameter"))?;

    let delivery = Delivery::from_format(query.format.as_deref());

    tracing::debug!(
        shape = normalizer.classify(reference).map(|shape| shape.as_str()),
        "Normalizing media reference"
    );

    match normalizer.normalize(Some(reference)) {
        NormalizedReference::Absent => Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Unrecognized media reference",
        )),
        NormalizedReference::PassThrough(url) => {
            if delivery == Delivery::Redirect && !normalizer.is_redirect_safe(&url) {
                tracing::debug!("Not redirecting to foreign pass-through URL");
                return Ok(DownloadResponse::deliver(Delivery::Json, url, None));
            }
            Ok(DownloadResponse::deliver(delivery, url, None))
        }
        NormalizedReference::Canonical(key) => match media_storage.sign_download(&key).await {
            Ok(presigned) => {
                tracing::debug!("Signed download for {key}");
                Ok(DownloadResponse::deliver(
                    delivery,
                    presigned.url,
                    Some(media_storage.presigned_url_expiry_secs()),
                ))
            }
            Err(BucketError::NotConfigured) => {
                tracing::warn!("Object storage is not configured, returning placeholder for {key}");
                Ok(DownloadResponse::Unavailable)
            }
            Err(e) => Err(AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate download URL",
            )
            .with_details(e.to_string())),
        },
    }
}

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use sha2::{Digest, Sha256};

use crate::types::AppError;

/// Who is allowed to upload files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAuth {
    /// Anyone may upload (`ALLOW_PUBLIC_UPLOADS=true`)
    Public,
    /// Callers must present `Authorization: Bearer <token>`
    Token(String),
    /// No token configured and public uploads off: every upload is refused
    Disabled,
}

impl UploadAuth {
    /// Whether a request carrying `presented` as bearer token may upload
    #[must_use]
    pub fn permits(&self, presented: Option<&str>) -> bool {
        match (self, presented) {
            (Self::Public, _) => true,
            (Self::Token(expected), Some(presented)) => {
                // Compare digests so the comparison time does not depend on the token
                Sha256::digest(expected.as_bytes()) == Sha256::digest(presented.as_bytes())
            }
            (Self::Token(_), None) | (Self::Disabled, _) => false,
        }
    }
}

/// Upload authorization middleware
///
/// Extracts the Bearer token from the Authorization header and checks it
/// against the configured `UploadAuth`. Returns 401 when it does not match.
///
/// # Errors
///
/// - `AppError` - Invalid/missing token with 401 status code
pub async fn upload_auth_middleware(
    Extension(upload_auth): Extension<UploadAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim);

    if !upload_auth.permits(token) {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    Ok(next.run(request).await)
}

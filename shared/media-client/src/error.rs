//! Error types for signed URL resolution

use thiserror::Error;

/// Result type for resolution operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that can occur while resolving a media reference
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The download endpoint base URL could not be parsed
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Network or transport failure
    #[error("Request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("Failed to get signed URL: {status} - {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },
}

impl From<reqwest::Error> for ResolveError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.to_string())
    }
}

impl From<reqwest_middleware::Error> for ResolveError {
    fn from(error: reqwest_middleware::Error) -> Self {
        Self::Request(error.to_string())
    }
}

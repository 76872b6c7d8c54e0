use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Prefix every canonical storage key starts with
pub const UPLOADS_PREFIX: &str = "uploads/";

/// Errors produced when building a canonical key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The value does not live under `uploads/`
    #[error("Key must start with `{UPLOADS_PREFIX}`: {0}")]
    MissingPrefix(String),

    /// Nothing follows the `uploads/` prefix
    #[error("Key has no object path after `{UPLOADS_PREFIX}`")]
    EmptyPath,

    /// The original file name sanitized down to nothing
    #[error("File name is empty")]
    EmptyFileName,
}

/// Bare object-store key of the form `uploads/<folder>/<file>`.
///
/// This is the only form persisted on content records going forward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    /// Accepts a value that is already canonical.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::MissingPrefix` when the value does not start with `uploads/`
    /// and `KeyError::EmptyPath` when nothing follows the prefix.
    pub fn parse(value: impl Into<String>) -> Result<Self, KeyError> {
        let value = value.into();
        match value.strip_prefix(UPLOADS_PREFIX) {
            None => Err(KeyError::MissingPrefix(value)),
            Some(rest) if rest.trim_matches('/').is_empty() => Err(KeyError::EmptyPath),
            Some(_) => Ok(Self(value)),
        }
    }

    /// Builds the key an upload is stored under:
    /// `uploads/<folder>/<timestamp_ms>-<nonce>-<sanitized-name>`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::EmptyFileName` if `original_name` is empty.
    pub fn for_upload(
        folder: &str,
        timestamp_ms: i64,
        nonce: &str,
        original_name: &str,
    ) -> Result<Self, KeyError> {
        if original_name.is_empty() {
            return Err(KeyError::EmptyFileName);
        }

        let folder = sanitize_folder(folder).unwrap_or_else(|| "general".to_string());
        let file_name = sanitize_file_name(original_name);

        Ok(Self(format!(
            "{UPLOADS_PREFIX}{folder}/{}",
            stored_file_name(timestamp_ms, nonce, &file_name)
        )))
    }

    /// Borrow the key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Take ownership of the underlying string
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Cleans a caller-supplied folder hint.
///
/// Keeps `[A-Za-z0-9_-]` inside each segment, drops empty and dot segments.
/// Returns `None` if nothing usable is left.
#[must_use]
pub fn sanitize_folder(folder: &str) -> Option<String> {
    let segments: Vec<String> = folder
        .split('/')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// File name component of an upload key
#[must_use]
pub fn stored_file_name(timestamp_ms: i64, nonce: &str, sanitized_name: &str) -> String {
    format!("{timestamp_ms}-{nonce}-{sanitized_name}")
}

//! Media references as stored on content records.
//!
//! A record may hold an absolute URL, a persisted endpoint URL, a native
//! object-store URL or a bare `uploads/...` key. [`KeyNormalizer`] reduces all of
//! them to a [`NormalizedReference`].

mod key;
mod normalizer;

pub use key::{
    sanitize_file_name, sanitize_folder, stored_file_name, CanonicalKey, KeyError, UPLOADS_PREFIX,
};
pub use normalizer::{
    KeyNormalizer, NormalizedReference, ReferenceShape, DEFAULT_NATIVE_HOST,
    DOWNLOAD_ENDPOINT_PATH,
};

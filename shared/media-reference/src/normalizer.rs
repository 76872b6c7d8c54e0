use percent_encoding::percent_decode_str;
use strum::IntoStaticStr;
use url::Url;

use crate::key::{CanonicalKey, UPLOADS_PREFIX};

/// Native host of the Backblaze B2 object store
pub const DEFAULT_NATIVE_HOST: &str = "backblazeb2.com";

/// Path of the download endpoint, as it appears in persisted endpoint URLs
pub const DOWNLOAD_ENDPOINT_PATH: &str = "/api/download";

const KEY_PARAM: &str = "key";
const UPLOADS_SEGMENT: &str = "uploads";
/// Base used to parse root-relative endpoint URLs
const PLACEHOLDER_BASE: &str = "http://localhost";

/// What a stored media reference reduces to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedReference {
    /// Directly usable URL, no signing required
    PassThrough(String),
    /// Object-store key that must be signed before use
    Canonical(CanonicalKey),
    /// Nothing to render, callers show a placeholder
    Absent,
}

impl NormalizedReference {
    /// Whether callers should render a placeholder
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Shapes a stored media reference can take, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceShape {
    /// A previously resolved `/api/download?key=...` URL persisted by mistake
    EndpointUrl,
    /// A native object-store URL (usually an expired signed URL) embedding `uploads/...`
    NativeStorageUrl,
    /// Any other absolute `http(s)` URL
    ExternalUrl,
    /// Root-relative static asset such as `/placeholder-logo.png`
    LocalAsset,
    /// Already canonical `uploads/...` key
    CanonicalKey,
}

impl ReferenceShape {
    /// Precedence used by [`KeyNormalizer::normalize`]; the first match wins
    pub const ORDER: [Self; 5] = [
        Self::EndpointUrl,
        Self::NativeStorageUrl,
        Self::ExternalUrl,
        Self::LocalAsset,
        Self::CanonicalKey,
    ];

    /// Snake-case name, for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Reduces heterogeneous media references to a pass-through URL, a canonical key,
/// or absence.
///
/// Pure and synchronous. Malformed URLs never produce an error: the detector
/// declines and the reference falls through to the next shape. An endpoint URL
/// whose key cannot be extracted is kept verbatim as a pass-through.
#[derive(Debug, Clone)]
pub struct KeyNormalizer {
    native_hosts: Vec<String>,
}

impl Default for KeyNormalizer {
    fn default() -> Self {
        Self {
            native_hosts: vec![DEFAULT_NATIVE_HOST.to_string()],
        }
    }
}

impl KeyNormalizer {
    /// Normalizer that knows only the default native host
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers another host whose URLs embed object keys (subdomains included)
    #[must_use]
    pub fn with_native_host(mut self, host: &str) -> Self {
        let host = host.trim().trim_start_matches('.').to_ascii_lowercase();
        if !host.is_empty() && !self.native_hosts.contains(&host) {
            self.native_hosts.push(host);
        }
        self
    }

    /// Hosts treated as the object store's native domain
    #[must_use]
    pub fn native_hosts(&self) -> &[String] {
        &self.native_hosts
    }

    /// Reduces `reference` following [`ReferenceShape::ORDER`].
    ///
    /// Normalizing a canonical key returns it unchanged.
    #[must_use]
    pub fn normalize(&self, reference: Option<&str>) -> NormalizedReference {
        let Some(reference) = reference.filter(|r| !r.trim().is_empty()) else {
            return NormalizedReference::Absent;
        };

        ReferenceShape::ORDER
            .into_iter()
            .find_map(|shape| self.detect(shape, reference))
            .unwrap_or(NormalizedReference::Absent)
    }

    /// Shape that [`Self::normalize`] would pick for `reference`
    #[must_use]
    pub fn classify(&self, reference: &str) -> Option<ReferenceShape> {
        if reference.trim().is_empty() {
            return None;
        }

        ReferenceShape::ORDER
            .into_iter()
            .find(|shape| self.detect(*shape, reference).is_some())
    }

    /// Whether `url` may be used as a redirect target without turning the
    /// download endpoint into an open redirect.
    ///
    /// Only root-relative paths on this site and URLs on a native host
    /// qualify. References pointing back at the download endpoint never do.
    #[must_use]
    pub fn is_redirect_safe(&self, url: &str) -> bool {
        if url.contains(DOWNLOAD_ENDPOINT_PATH) {
            return false;
        }
        if is_local_path(url) {
            return true;
        }

        is_absolute_http(url)
            && Url::parse(url)
                .is_ok_and(|url| url.host_str().is_some_and(|host| self.is_native_host(host)))
    }

    fn is_native_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.native_hosts
            .iter()
            .any(|native| host == *native || host.ends_with(&format!(".{native}")))
    }

    fn detect(&self, shape: ReferenceShape, reference: &str) -> Option<NormalizedReference> {
        match shape {
            ReferenceShape::EndpointUrl => looks_like_endpoint_url(reference).then(|| {
                // A malformed endpoint URL is kept verbatim rather than dropped
                endpoint_key(reference).map_or_else(
                    || NormalizedReference::PassThrough(reference.to_string()),
                    NormalizedReference::Canonical,
                )
            }),
            ReferenceShape::NativeStorageUrl => self
                .native_storage_key(reference)
                .map(NormalizedReference::Canonical),
            ReferenceShape::ExternalUrl => is_absolute_http(reference)
                .then(|| NormalizedReference::PassThrough(reference.to_string())),
            ReferenceShape::LocalAsset => {
                (is_local_path(reference) && !reference.contains(UPLOADS_PREFIX))
                    .then(|| NormalizedReference::PassThrough(reference.to_string()))
            }
            ReferenceShape::CanonicalKey => CanonicalKey::parse(reference)
                .ok()
                .map(NormalizedReference::Canonical),
        }
    }

    fn native_storage_key(&self, reference: &str) -> Option<CanonicalKey> {
        let url = Url::parse(reference).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !self.is_native_host(url.host_str()?) {
            return None;
        }

        let segments: Vec<&str> = url.path_segments()?.collect();
        let start = segments.iter().position(|s| *s == UPLOADS_SEGMENT)?;

        let decoded = segments[start..]
            .iter()
            .map(|segment| decode_component(segment))
            .collect::<Option<Vec<_>>>()?;

        CanonicalKey::parse(decoded.join("/")).ok()
    }
}

fn looks_like_endpoint_url(reference: &str) -> bool {
    reference.contains(DOWNLOAD_ENDPOINT_PATH) && reference.contains("key=")
}

/// Strict percent-decoding; invalid UTF-8 declines instead of being replaced
fn decode_component(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Extracts the `key` parameter of a persisted download endpoint URL
fn endpoint_key(reference: &str) -> Option<CanonicalKey> {
    let url = Url::parse(reference)
        .or_else(|_| Url::parse(PLACEHOLDER_BASE).and_then(|base| base.join(reference)))
        .ok()?;

    if !url.path().ends_with(DOWNLOAD_ENDPOINT_PATH) {
        return None;
    }

    let raw = url.query()?.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        (name == KEY_PARAM).then_some(value)
    })?;
    let value = decode_component(&raw.replace('+', " "))?;

    // Some records were encoded twice before being persisted
    if value.starts_with(UPLOADS_PREFIX) {
        CanonicalKey::parse(value).ok()
    } else {
        CanonicalKey::parse(decode_component(&value)?).ok()
    }
}

/// Root-relative path on this site; `//host` and `/\host` are network paths
fn is_local_path(reference: &str) -> bool {
    reference.starts_with('/') && !reference.starts_with("//") && !reference.starts_with("/\\")
}

fn is_absolute_http(reference: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        reference
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

use std::time::Duration;

use media_reference::DOWNLOAD_ENDPOINT_PATH;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;
use url::Url;

use crate::error::{ResolveError, ResolveResult};

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Something that can exchange a stored media reference for a render-ready URL
#[async_trait::async_trait]
pub trait SignedUrlSource: Send + Sync + 'static {
    /// Resolves `reference` through the download endpoint.
    ///
    /// `Ok(None)` means the endpoint succeeded without a URL (storage not
    /// configured); callers show a placeholder rather than an error.
    async fn fetch_signed_url(&self, reference: &str) -> ResolveResult<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct SignedUrlPayload {
    url: Option<String>,
}

/// Calls `GET /api/download?key=..&format=json` over HTTP
pub struct HttpSignedUrlSource {
    endpoint: Url,
    http_client: ClientWithMiddleware,
}

impl HttpSignedUrlSource {
    /// Creates a source for the site rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidEndpoint` if `base_url` is not a valid URL
    /// Returns `ResolveError::Client` if the HTTP client cannot be built
    pub fn new(base_url: &str) -> ResolveResult<Self> {
        let endpoint = Url::parse(base_url)?.join(DOWNLOAD_ENDPOINT_PATH)?;

        let reqwest_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .map_err(|e| ResolveError::Client(e.to_string()))?;

        let http_client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Full endpoint URL requested for `reference`
    #[must_use]
    pub fn request_url(&self, reference: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", reference)
            .append_pair("format", "json");
        url
    }
}

#[async_trait::async_trait]
impl SignedUrlSource for HttpSignedUrlSource {
    async fn fetch_signed_url(&self, reference: &str) -> ResolveResult<Option<String>> {
        let response = self
            .http_client
            .get(self.request_url(reference))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResolveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response.json::<SignedUrlPayload>().await?;

        Ok(payload.url.filter(|url| !url.is_empty()))
    }
}

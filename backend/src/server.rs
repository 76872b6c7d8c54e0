use std::sync::Arc;

use axum::Extension;
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use media_reference::KeyNormalizer;
use tokio::net::TcpListener;

use crate::routes;
use crate::{media_storage::MediaStorage, middleware::UploadAuth, types::Environment};

/// Shared dependencies handed to every request
pub struct AppDependencies {
    /// Signing and upload backend
    pub media_storage: Arc<MediaStorage>,
    /// Reference normalizer used by the download endpoint
    pub key_normalizer: Arc<KeyNormalizer>,
    /// Upload authorization policy
    pub upload_auth: UploadAuth,
}

/// Builds the application router with its dependencies attached
pub fn router(environment: Environment, dependencies: AppDependencies) -> axum::Router {
    let mut openapi = routes::api_spec();

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(dependencies.media_storage))
        .layer(Extension(dependencies.key_normalizer))
        .layer(Extension(dependencies.upload_auth))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(environment: Environment, dependencies: AppDependencies) -> anyhow::Result<()> {
    let router = router(environment, dependencies)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(60),
        ));

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8001), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Minbar media backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

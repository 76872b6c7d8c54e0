mod docs;
pub mod download;
pub mod health;
pub mod upload;

pub use docs::api_spec;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::{extract::DefaultBodyLimit, middleware};

use crate::middleware::upload_auth_middleware;

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    let public_routes = ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route("/api/download", get(download::download));

    let upload_routes = ApiRouter::new()
        .api_route("/api/upload", post(upload::upload))
        .layer(middleware::from_fn(upload_auth_middleware))
        .layer(DefaultBodyLimit::max(upload::UPLOAD_BODY_LIMIT));

    public_routes.merge(upload_routes)
}

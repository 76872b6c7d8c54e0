use crate::types::Environment;
use aide::{
    axum::ApiRouter,
    openapi::{Info, OpenApi},
    scalar::Scalar,
};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json,
};

const DOCS_TITLE: &str = "Minbar Media API Docs";

/// Empty OpenAPI document carrying the service's title and version
#[must_use]
pub fn api_spec() -> OpenApi {
    OpenApi {
        info: Info {
            title: "Minbar Media API".to_string(),
            description: Some(
                "Signed download URLs and uploads for media stored in object storage".to_string(),
            ),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Info::default()
        },
        ..OpenApi::default()
    }
}

/// `/docs` and `/openapi.json`, both hidden outside development and staging
pub fn handler() -> ApiRouter {
    let scalar = Scalar::new("/openapi.json").with_title(DOCS_TITLE);

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
        .layer(middleware::from_fn(hide_unless_enabled))
}

async fn hide_unless_enabled(
    Extension(environment): Extension<Environment>,
    request: Request,
    next: Next,
) -> Response {
    if environment.show_api_docs() {
        next.run(request).await
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

#[allow(clippy::unused_async)]
async fn openapi_schema(Extension(openapi): Extension<OpenApi>) -> Json<OpenApi> {
    Json(openapi)
}

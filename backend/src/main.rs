use std::sync::Arc;

use backend::{
    media_storage::MediaStorage,
    server::{self, AppDependencies},
    types::Environment,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    let storage_config = environment.storage_config();
    if storage_config.is_none() {
        tracing::warn!("B2_* variables incomplete, media will render as placeholders");
    }

    let media_storage = Arc::new(
        MediaStorage::from_config(
            storage_config.as_ref(),
            environment.signed_url_expiry_secs(),
        )
        .await,
    );
    let key_normalizer = Arc::new(environment.key_normalizer(storage_config.as_ref()));
    let upload_auth = environment.upload_auth();

    server::start(
        environment,
        AppDependencies {
            media_storage,
            key_normalizer,
            upload_auth,
        },
    )
    .await
}

use std::sync::{Arc, Mutex};

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Router,
};
use backend::media_storage::StorageConfig;
use tokio::net::TcpListener;

use super::test_setup::localstack_storage_config;

/// A request received by [`FakeObjectStore`]
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// In-process object store that records requests and answers every one with 200
#[derive(Clone, Default)]
pub struct FakeObjectStore {
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl FakeObjectStore {
    /// Serves the fake store on an ephemeral port, returning storage settings
    /// that point at it
    pub async fn spawn() -> (Self, StorageConfig) {
        let store = Self::default();
        let app = Router::new().fallback(record).with_state(store.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake object store");
        let addr = listener.local_addr().expect("Failed to read local address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake object store stopped");
        });

        let config = StorageConfig {
            endpoint: format!("http://{addr}"),
            ..localstack_storage_config()
        };

        (store, config)
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(State(store): State<FakeObjectStore>, request: Request) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX)
        .await
        .map(|bytes| bytes.to_vec())
        .unwrap_or_default();

    store.requests.lock().unwrap().push(ReceivedRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body,
    });

    (StatusCode::OK, [("ETag", "\"fake-etag\"")])
}

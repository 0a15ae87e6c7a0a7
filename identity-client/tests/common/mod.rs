#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use identity_client::{AnonymousIdentityResolver, HttpIdentityApi, MemoryNotifier, MemoryStore};
use serde_json::{json, Value};
use shared::{ApiConfig, TopicId};

/// Knobs and recordings of the mock Identity API.
#[derive(Debug, Default)]
pub struct MockState {
    pub names: HashMap<String, String>,
    pub get_status: Option<StatusCode>,
    pub put_status: Option<StatusCode>,
    pub delete_status: Option<StatusCode>,
    /// Answer GET for unknown topics with 200 and no data instead of 404.
    pub empty_instead_of_404: bool,
    /// Appended to every name the PUT handler accepts.
    pub rename_suffix: Option<String>,
    pub put_errors: Option<Vec<String>>,
    pub put_bodies: Vec<Value>,
    pub authorization: Vec<Option<String>>,
    pub request_ids: Vec<Option<String>>,
    pub hits: usize,
}

#[derive(Clone, Default)]
pub struct MockIdentityServer {
    state: Arc<Mutex<MockState>>,
}

impl MockIdentityServer {
    pub async fn start() -> (Self, String) {
        let server = Self::default();

        let app = Router::new()
            .route(
                "/api/topics/{topic_id}/anonymous-identity",
                get(get_identity).put(put_identity),
            )
            .route(
                "/api/users/anonymous-identity/{topic_id}",
                delete(delete_identity),
            )
            .with_state(server.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Identity API");
        let addr = listener.local_addr().expect("Mock Identity API has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (server, format!("http://{}", addr))
    }

    pub fn update(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn read<T>(&self, f: impl FnOnce(&MockState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }

    pub fn hits(&self) -> usize {
        self.read(|state| state.hits)
    }

    fn record(&self, headers: &HeaderMap) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let mut state = self.state.lock().unwrap();
        state.hits += 1;
        state.authorization.push(header("authorization"));
        state.request_ids.push(header("x-request-id"));
    }
}

fn forced_failure(status: StatusCode) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "errors": ["forced failure"] })))
}

async fn get_identity(
    State(server): State<MockIdentityServer>,
    Path(topic_id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    server.record(&headers);
    let state = server.state.lock().unwrap();

    if let Some(status) = state.get_status {
        return forced_failure(status);
    }

    match state.names.get(&topic_id) {
        Some(name) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": { "anonymous_name": name } })),
        ),
        None if state.empty_instead_of_404 => {
            (StatusCode::OK, Json(json!({ "success": true, "data": null })))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "errors": ["Anonymous identity not found"] })),
        ),
    }
}

async fn put_identity(
    State(server): State<MockIdentityServer>,
    Path(topic_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    server.record(&headers);
    let mut state = server.state.lock().unwrap();
    state.put_bodies.push(body.clone());

    if let Some(status) = state.put_status {
        return forced_failure(status);
    }

    if let Some(errors) = state.put_errors.clone() {
        return (StatusCode::OK, Json(json!({ "success": false, "errors": errors })));
    }

    let requested = body["custom_anonymous_name"].as_str().unwrap_or_default();
    let name = format!("{}{}", requested, state.rename_suffix.clone().unwrap_or_default());
    state.names.insert(topic_id, name.clone());

    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "anonymous_name": name } })),
    )
}

async fn delete_identity(
    State(server): State<MockIdentityServer>,
    Path(topic_id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    server.record(&headers);
    let mut state = server.state.lock().unwrap();

    if let Some(status) = state.delete_status {
        return forced_failure(status);
    }

    match state.names.remove(&topic_id) {
        Some(_) => (StatusCode::OK, Json(json!({ "success": true }))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "errors": ["Nothing to delete"] })),
        ),
    }
}

pub fn topic(id: &str) -> TopicId {
    TopicId::new(id).expect("valid topic id")
}

pub struct Harness {
    pub server: MockIdentityServer,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub resolver: Arc<AnonymousIdentityResolver>,
}

pub async fn harness() -> Harness {
    let (server, base_url) = MockIdentityServer::start().await;
    let api = HttpIdentityApi::new(&ApiConfig::new(base_url)).expect("HTTP client");
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let resolver = Arc::new(AnonymousIdentityResolver::new(
        Arc::new(api),
        store.clone(),
        notifier.clone(),
    ));

    Harness {
        server,
        store,
        notifier,
        resolver,
    }
}

/// Base URL nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind placeholder socket");
    let addr = listener.local_addr().expect("Placeholder socket has no address");
    drop(listener);
    format!("http://{}", addr)
}

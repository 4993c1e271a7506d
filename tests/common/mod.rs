//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use mcp_relay::{RelayConfig, RelayServer, Shutdown};
use serde_json::Value;
use tokio::net::TcpListener;

/// What the mock EDF service answers with.
#[derive(Clone)]
pub enum EdfReply {
    Json(Value),
    Bytes(Vec<u8>),
    Text(&'static str),
    Status(u16),
    Delay(Duration),
}

/// One upload as seen by the mock EDF service.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub path: String,
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub request_id: Option<String>,
}

#[derive(Clone)]
struct EdfState {
    reply: EdfReply,
    hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

pub struct MockEdf {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl MockEdf {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<ReceivedUpload> {
        self.received.lock().unwrap().clone()
    }
}

/// Start a mock EDF service answering every POST path with `reply`.
pub async fn start_mock_edf(reply: EdfReply) -> MockEdf {
    let hits = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = EdfState {
        reply,
        hits: hits.clone(),
        received: received.clone(),
    };

    let app = Router::new().fallback(edf_handler).with_state(state);
    let addr = serve(app).await;

    MockEdf { addr, hits, received }
}

async fn edf_handler(
    State(state): State<EdfState>,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        state.received.lock().unwrap().push(ReceivedUpload {
            path: uri.path().to_string(),
            field: name,
            file_name,
            bytes,
            request_id: headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        });
    }

    match state.reply {
        EdfReply::Json(value) => Json(value).into_response(),
        EdfReply::Bytes(bytes) => (
            [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        EdfReply::Text(text) => text.into_response(),
        EdfReply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            (status, Json(serde_json::json!({ "error": "boom" }))).into_response()
        }
        EdfReply::Delay(delay) => {
            tokio::time::sleep(delay).await;
            Json(serde_json::json!({ "late": true })).into_response()
        }
    }
}

/// What the mock inference service answers with.
#[derive(Clone)]
pub enum InferenceReply {
    Json(Value),
    Status(u16),
}

#[derive(Clone)]
struct InferenceState {
    reply: InferenceReply,
    requests: Arc<Mutex<Vec<Value>>>,
}

pub struct MockInference {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockInference {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock inference service exposing `POST /api/generate`.
pub async fn start_mock_inference(reply: InferenceReply) -> MockInference {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = InferenceState {
        reply,
        requests: requests.clone(),
    };

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .with_state(state);
    let addr = serve(app).await;

    MockInference { addr, requests }
}

async fn generate_handler(
    State(state): State<InferenceState>,
    Json(body): Json<Value>,
) -> Response {
    state.requests.lock().unwrap().push(body);
    match state.reply {
        InferenceReply::Json(value) => Json(value).into_response(),
        InferenceReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A relay under test.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub staging_dir: PathBuf,
    shutdown: Shutdown,
    _staging: tempfile::TempDir,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn staged_files(&self) -> usize {
        count_entries(&self.staging_dir)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Config pointing at the given services, with defaults elsewhere.
pub fn relay_config(edf_url: &str, inference_url: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.services.edf_url = edf_url.to_string();
    config.services.inference_url = inference_url.to_string();
    config
}

/// Start the relay on an ephemeral port with a private staging directory.
pub async fn spawn_relay(mut config: RelayConfig) -> TestRelay {
    let staging = tempfile::tempdir().unwrap();
    let staging_dir = staging.path().join("uploads");
    config.staging.dir = Some(staging_dir.clone());

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestRelay {
        addr,
        staging_dir,
        shutdown,
        _staging: staging,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// A multipart form with `bytes` under field `file`.
pub fn file_form(bytes: &[u8], file_name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string()),
    )
}

/// A few hundred bytes that look like the start of an EDF header.
pub fn sample_edf() -> Vec<u8> {
    let mut bytes = b"0       X X X X                                                                         ".to_vec();
    bytes.extend((0u8..=255).cycle().take(512));
    bytes
}

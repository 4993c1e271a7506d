//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all relay handlers
//! - Wire up middleware (tracing, request ID, CORS, body limit)
//! - Build the downstream clients shared by every request
//! - Serve until the shutdown signal fires

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, Request},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::downstream::{EdfClient, InferenceClient};
use crate::http::request::{MakeRelayRequestId, RequestIdExt, X_REQUEST_ID};
use crate::lifecycle::shutdown::triggered;
use crate::relay::{query, upload, UploadRoute};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub edf: EdfClient,
    pub inference: InferenceClient,
    pub staging_dir: Arc<PathBuf>,
}

/// HTTP server for the relay.
pub struct RelayServer {
    router: Router,
    config: RelayConfig,
    staging_dir: Arc<PathBuf>,
}

impl RelayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let staging_dir = Arc::new(config.staging.resolve_dir());
        let state = AppState {
            edf: EdfClient::new(&config.services, &config.timeouts)?,
            inference: InferenceClient::new(&config.services, &config.timeouts)?,
            staging_dir: staging_dir.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            staging_dir,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(health))
            .route("/mcp/query", post(query::query));

        for route in UploadRoute::ALL {
            router = router.route(
                &route.mount_path(),
                post(
                    move |State(state): State<AppState>,
                          headers: HeaderMap,
                          multipart: Result<Multipart, MultipartRejection>| {
                        upload::forward_upload(state, route, headers, multipart)
                    },
                ),
            );
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRelayRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = request.headers().request_id().unwrap_or("unknown"),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(RequestBodyLimitLayer::new(config.listener.max_upload_bytes))
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::disable()),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(self.staging_dir.as_path()).await?;

        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            edf_url = %self.config.services.edf_url,
            inference_url = %self.config.services.inference_url,
            staging_dir = %self.staging_dir.display(),
            "MCP relay running"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                triggered(shutdown).await;
                tracing::info!("Shutdown signal received, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

//! Upload Relay: six multipart routes forwarded to the EDF service.

use std::str::FromStr;
use std::time::Instant;

use axum::{
    extract::{multipart::MultipartRejection, Multipart},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

use crate::error::RelayError;
use crate::http::response::{stream_image, DataEnvelope};
use crate::http::server::AppState;
use crate::http::RequestIdExt;
use crate::relay::finish;
use crate::relay::staging::StagedUpload;

/// Multipart field the upload must arrive under.
pub const FILE_FIELD: &str = "file";

/// How a downstream result is handed back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parse as JSON and wrap in `{status, data}`.
    Json,
    /// Pipe the raw bytes through.
    Stream,
}

/// One of the fixed upload routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadRoute {
    Eeg,
    Visualize,
    Features,
    Summary,
    Export,
    Filter,
}

impl UploadRoute {
    pub const ALL: [UploadRoute; 6] = [
        UploadRoute::Eeg,
        UploadRoute::Visualize,
        UploadRoute::Features,
        UploadRoute::Summary,
        UploadRoute::Export,
        UploadRoute::Filter,
    ];

    /// Route name as it appears under `/mcp/`.
    pub fn name(self) -> &'static str {
        match self {
            UploadRoute::Eeg => "eeg",
            UploadRoute::Visualize => "visualize",
            UploadRoute::Features => "features",
            UploadRoute::Summary => "summary",
            UploadRoute::Export => "export",
            UploadRoute::Filter => "filter",
        }
    }

    /// Path on the EDF service this route forwards to.
    pub fn downstream_path(self) -> &'static str {
        match self {
            UploadRoute::Eeg => "/read-edf",
            UploadRoute::Visualize => "/visualize-edf",
            UploadRoute::Features => "/features-edf",
            UploadRoute::Summary => "/summary-edf",
            UploadRoute::Export => "/export-edf",
            UploadRoute::Filter => "/filter-edf",
        }
    }

    pub fn mode(self) -> ResponseMode {
        match self {
            UploadRoute::Visualize | UploadRoute::Export => ResponseMode::Stream,
            _ => ResponseMode::Json,
        }
    }

    /// Inbound path the route is mounted on.
    pub fn mount_path(self) -> String {
        format!("/mcp/{}", self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown upload route '{0}' (expected one of eeg, visualize, features, summary, export, filter)")]
pub struct UnknownRoute(pub String);

impl FromStr for UploadRoute {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UploadRoute::ALL
            .into_iter()
            .find(|route| route.name() == s)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

/// Handler shared by every upload route.
pub async fn forward_upload(
    state: AppState,
    route: UploadRoute,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let start = Instant::now();
    let result = relay_upload(&state, route, &headers, multipart).await;
    finish(route.name(), start, result)
}

async fn relay_upload(
    state: &AppState,
    route: UploadRoute,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let endpoint = route.downstream_path();

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(endpoint, error = %rejection, "Request is not a multipart upload");
        RelayError::NoFile
    })?;

    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(RelayError::NoFile),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(RelayError::TooLarge { endpoint });
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "Malformed multipart body");
                return Err(RelayError::NoFile);
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // A plain text part named `file` is a form value, not an upload.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        break StagedUpload::stage(Some(file_name.as_str()), field, &state.staging_dir)
            .await
            .map_err(|source| {
                if source.is_too_large() {
                    RelayError::TooLarge { endpoint }
                } else {
                    RelayError::Staging { endpoint, source }
                }
            })?;
    };

    let forwarded = state
        .edf
        .forward(endpoint, &upload, headers.request_id())
        .await;
    // The downstream call is over; the staged copy is no longer needed either way.
    drop(upload);
    let response = forwarded.map_err(|source| RelayError::Downstream { endpoint, source })?;

    match route.mode() {
        ResponseMode::Json => {
            let data: Value = response.json().await.map_err(|e| RelayError::Downstream {
                endpoint,
                source: e.into(),
            })?;
            Ok(Json(DataEnvelope::success(data)).into_response())
        }
        ResponseMode::Stream => Ok(stream_image(response)),
    }
}

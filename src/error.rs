//! Relay error taxonomy and its mapping onto HTTP responses.
//!
//! Validation failures become `400` with a JSON `{error}` body. Everything that
//! goes wrong after a request was accepted becomes `500` with a plain-text body
//! naming the operation that failed. A body that outgrows the upload limit
//! mid-stream is `413`, same as one refused up front.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::downstream::DownstreamError;
use crate::relay::staging::StagingError;

/// Errors surfaced by relay handlers.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The multipart body carried no `file` part.
    #[error("No file uploaded")]
    NoFile,

    /// The query body carried no usable `question`.
    #[error("Question is required")]
    MissingQuestion,

    /// The request body ran past the inbound size limit while streaming.
    #[error("upload to {endpoint} exceeds the body size limit")]
    TooLarge { endpoint: &'static str },

    /// The upload could not be written to the staging area.
    #[error("failed to stage upload for {endpoint}: {source}")]
    Staging {
        endpoint: &'static str,
        #[source]
        source: StagingError,
    },

    /// The EDF service call failed.
    #[error("{endpoint} error: {source}")]
    Downstream {
        endpoint: &'static str,
        #[source]
        source: DownstreamError,
    },

    /// The inference service call failed.
    #[error("/mcp/query error: {source}")]
    Query {
        #[source]
        source: DownstreamError,
    },
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::NoFile | RelayError::MissingQuestion => StatusCode::BAD_REQUEST,
            RelayError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::NoFile | RelayError::MissingQuestion => {
                let body = Json(json!({ "error": self.to_string() }));
                (self.status(), body).into_response()
            }
            RelayError::TooLarge { endpoint } => {
                tracing::warn!(endpoint, "Upload exceeds the body size limit");
                (self.status(), "length limit exceeded").into_response()
            }
            RelayError::Staging { endpoint, ref source } => {
                tracing::error!(endpoint, error = %source, "Upload staging failed");
                (self.status(), format!("Error processing {}", endpoint)).into_response()
            }
            RelayError::Downstream { endpoint, ref source } => {
                tracing::error!(endpoint, error = %source, "Downstream call failed");
                (self.status(), format!("Error processing {}", endpoint)).into_response()
            }
            RelayError::Query { ref source } => {
                tracing::error!(error = %source, "Inference call failed");
                (self.status(), "Error processing query").into_response()
            }
        }
    }
}

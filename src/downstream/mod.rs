//! Downstream service clients.
//!
//! # Data Flow
//! ```text
//! Upload Relay  → edf.rs       → POST <edf_url>/<path> (multipart "file")
//! Query Relay   → inference.rs → POST <inference_url>/api/generate (JSON)
//! ```
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` per service, cloned into every handler
//! - Every call is a single attempt; no retries
//! - Non-2xx responses are errors, the body is never relayed

pub mod edf;
pub mod inference;

use axum::http::StatusCode;
use thiserror::Error;

pub use edf::EdfClient;
pub use inference::InferenceClient;

/// Errors that can occur while talking to a downstream service.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// Connection could not be established or the request failed in flight.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The call exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// The response body could not be decoded.
    #[error("malformed response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// The staged upload could not be reopened for sending.
    #[error("failed to read staged upload: {0}")]
    Upload(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DownstreamError::Timeout
        } else if err.is_decode() {
            DownstreamError::Decode(err)
        } else {
            DownstreamError::Transport(err)
        }
    }
}

/// Join a service base URL and an absolute path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Fail non-2xx responses, keeping the body unread.
pub(crate) fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DownstreamError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DownstreamError::Status(status))
    }
}

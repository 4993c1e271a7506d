//! Relay handlers.
//!
//! # Data Flow
//! ```text
//! POST /mcp/<route> (multipart)
//!     → upload.rs (find "file" field)
//!     → staging.rs (write to temp file, removed on drop)
//!     → downstream::EdfClient (forward)
//!     → JSON envelope or image stream
//!
//! POST /mcp/query (JSON)
//!     → query.rs (require question)
//!     → downstream::InferenceClient (generate)
//!     → answer envelope
//! ```
//!
//! # Design Decisions
//! - Handlers hold no state between requests
//! - Every path ends in a response; errors are converted at the handler boundary

pub mod query;
pub mod staging;
pub mod upload;

use std::time::Instant;

use axum::response::{IntoResponse, Response};

use crate::error::RelayError;
use crate::observability::metrics;

pub use staging::{StagedUpload, StagingError};
pub use upload::{ResponseMode, UnknownRoute, UploadRoute};

/// Turn a handler result into a response and record its outcome.
pub(crate) fn finish(
    route: &'static str,
    start: Instant,
    result: Result<Response, RelayError>,
) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    metrics::record_request(route, response.status(), start);
    response
}

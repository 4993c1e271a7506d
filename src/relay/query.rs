//! Query Relay: text questions forwarded to the inference service.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::RelayError;
use crate::http::response::AnswerEnvelope;
use crate::http::server::AppState;
use crate::http::RequestIdExt;
use crate::relay::finish;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: Option<String>,
}

impl QueryRequest {
    /// The question, if one was actually asked.
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref().filter(|q| !q.is_empty())
    }
}

/// `POST /mcp/query`
pub async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = relay_query(&state, &headers, body).await;
    finish("query", start, result)
}

async fn relay_query(
    state: &AppState,
    headers: &HeaderMap,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Response, RelayError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unusable query body");
        RelayError::MissingQuestion
    })?;
    let question = request.question().ok_or(RelayError::MissingQuestion)?;

    let answer = state
        .inference
        .generate(question, headers.request_id())
        .await
        .map_err(|source| RelayError::Query { source })?;

    Ok(Json(AnswerEnvelope::success(answer)).into_response())
}

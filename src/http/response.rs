//! Response envelopes and streaming.
//!
//! # Responsibilities
//! - Wrap successful JSON results in `{status, data}` / `{status, answer}`
//! - Pipe binary downstream bodies to the client chunk by chunk
//!
//! # Design Decisions
//! - Streaming responses never buffer the whole body
//! - Stream responses always advertise `image/png`, whatever the service said

use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::Value;

pub const STATUS_SUCCESS: &str = "success";
pub const STREAM_CONTENT_TYPE: &str = "image/png";

/// `{status: "success", data: ...}`
#[derive(Debug, Serialize)]
pub struct DataEnvelope {
    pub status: &'static str,
    pub data: Value,
}

impl DataEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            status: STATUS_SUCCESS,
            data,
        }
    }
}

/// `{status: "success", answer: ...}`
#[derive(Debug, Serialize)]
pub struct AnswerEnvelope {
    pub status: &'static str,
    pub answer: String,
}

impl AnswerEnvelope {
    pub fn success(answer: String) -> Self {
        Self {
            status: STATUS_SUCCESS,
            answer,
        }
    }
}

/// Relay a downstream body as-is under the fixed stream content type.
pub fn stream_image(downstream: reqwest::Response) -> Response {
    let stream = downstream
        .bytes_stream()
        .inspect_err(|e| tracing::warn!(error = %e, "Downstream stream interrupted"));

    (
        [(header::CONTENT_TYPE, STREAM_CONTENT_TYPE)],
        Body::from_stream(stream),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    #[test]
    fn test_envelope_shapes() {
        let data = serde_json::to_value(DataEnvelope::success(serde_json::json!({"ok": true}))).unwrap();
        assert_eq!(data, serde_json::json!({"status": "success", "data": {"ok": true}}));

        let answer = serde_json::to_value(AnswerEnvelope::success("world".into())).unwrap();
        assert_eq!(answer, serde_json::json!({"status": "success", "answer": "world"}));
    }

    #[tokio::test]
    async fn test_stream_image_overrides_content_type() {
        let payload = vec![0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe];
        let downstream = axum::http::Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(payload.clone())
            .unwrap();

        let response = stream_image(reqwest::Response::from(downstream));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], STREAM_CONTENT_TYPE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), payload.as_slice());
    }
}

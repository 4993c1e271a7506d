//! Text-generation inference service client.

use serde::{Deserialize, Serialize};

use crate::config::{ServicesConfig, TimeoutConfig};
use crate::downstream::{ensure_success, join_url, DownstreamError};
use crate::http::X_REQUEST_ID;

const GENERATE_PATH: &str = "/api/generate";

/// Body of a generation request.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// The part of a generation response the relay cares about.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Client for the inference service.
#[derive(Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl InferenceClient {
    pub fn new(services: &ServicesConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().connect_timeout(timeouts.connect());
        if let Some(deadline) = timeouts.query() {
            builder = builder.timeout(deadline);
        }

        Ok(Self {
            client: builder.build()?,
            url: join_url(&services.inference_url, GENERATE_PATH),
            model: services.inference_model.clone(),
        })
    }

    /// Generate a full (non-streamed) completion for `prompt`.
    pub async fn generate(
        &self,
        prompt: &str,
        request_id: Option<&str>,
    ) -> Result<String, DownstreamError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }

        let response = ensure_success(request.send().await?)?;
        let generated: GenerateResponse = response.json().await?;
        Ok(generated.response)
    }
}

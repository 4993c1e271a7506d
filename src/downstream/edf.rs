//! EDF processing service client.

use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;

use crate::config::{ServicesConfig, TimeoutConfig};
use crate::downstream::{ensure_success, join_url, DownstreamError};
use crate::http::X_REQUEST_ID;
use crate::relay::staging::StagedUpload;

/// Client for the EDF service. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct EdfClient {
    client: reqwest::Client,
    base_url: String,
}

impl EdfClient {
    pub fn new(services: &ServicesConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.request())
            .build()?;

        Ok(Self {
            client,
            base_url: services.edf_url.clone(),
        })
    }

    /// Send a staged upload to `path` as multipart field `file`.
    ///
    /// The file is streamed from disk. Returns the response once its status is
    /// known to be 2xx; the body is left for the caller to consume.
    pub async fn forward(
        &self,
        path: &str,
        upload: &StagedUpload,
        request_id: Option<&str>,
    ) -> Result<reqwest::Response, DownstreamError> {
        let file = upload.open().await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, upload.len())
            .file_name(upload.file_name().to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let url = join_url(&self.base_url, path);
        tracing::debug!(
            url = %url,
            file_name = %upload.file_name(),
            bytes = upload.len(),
            "Forwarding upload"
        );

        let mut request = self.client.post(url).multipart(form);
        if let Some(id) = request_id {
            request = request.header(X_REQUEST_ID, id);
        }

        let response = request.send().await?;
        ensure_success(response)
    }
}

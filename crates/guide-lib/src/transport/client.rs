use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use tracing::debug;

use super::wire::{ErrorResponse, PredictResponse};
use crate::config::{CONNECT_TIMEOUT_SECS, FILE_FIELD, REQUEST_TIMEOUT_SECS};
use crate::error::GuideError;
use crate::vision::{ClassificationResult, ClassificationService};

/// Blocking HTTP client for a remote vision service.
pub struct VisionClient {
    endpoint: String,
    http: Client,
}

impl VisionClient {
    /// Create a client posting images to `endpoint` (the full `/predict` URL).
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ClassificationService for VisionClient {
    fn classify(&mut self, image: &[u8]) -> Result<ClassificationResult, GuideError> {
        if image.is_empty() {
            return Err(GuideError::InvalidImage("image is empty".into()));
        }

        let (file_name, mime) = upload_name(image);
        let part = multipart::Part::bytes(image.to_vec())
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| GuideError::Classification(format!("invalid content type: {e}")))?;
        let form = multipart::Form::new().part(FILE_FIELD, part);

        debug!(endpoint = %self.endpoint, bytes = image.len(), "Posting image");
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    GuideError::ServiceUnavailable(e.to_string())
                } else {
                    GuideError::Classification(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GuideError::Classification(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error)
                .unwrap_or(body);
            return Err(if status == StatusCode::BAD_REQUEST {
                GuideError::InvalidImage(detail)
            } else {
                GuideError::Classification(format!("{status}: {detail}"))
            });
        }

        let payload: PredictResponse = serde_json::from_str(&body)
            .map_err(|e| GuideError::Classification(format!("malformed response: {e}")))?;
        payload.into_result()
    }
}

/// File name and content type for the upload, sniffed from the bytes.
fn upload_name(image: &[u8]) -> (String, &'static str) {
    match image::guess_format(image) {
        Ok(format) => {
            let ext = format.extensions_str().first().copied().unwrap_or("bin");
            (format!("image.{ext}"), format.to_mime_type())
        }
        Err(_) => ("image.bin".to_string(), "application/octet-stream"),
    }
}

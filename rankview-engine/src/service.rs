//! Decomposition service client
//!
//! The service takes an image plus the width/height to resample it to and
//! answers with the raw factor payload decoded by
//! [`rankview_common::wire::decode_payload`].

use crate::reconstruct::Orchestrator;
use async_trait::async_trait;
use bytes::Bytes;
use rankview_common::config::ServiceConfig;
use rankview_common::{Dimensions, Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};
use uuid::Uuid;

/// Path of the factorization endpoint under the service base URL
pub const SVD_ENDPOINT: &str = "/api/svd";

/// Anything that can turn an image into a factor payload
#[async_trait]
pub trait DecompositionService: Send + Sync {
    /// Factor `image` at `dims`, returning the wire payload
    async fn decompose(&self, image: Vec<u8>, file_name: String, dims: Dimensions) -> Result<Bytes>;
}

/// HTTP client for the decomposition service
pub struct HttpDecompositionService {
    client: Client,
    endpoint: String,
}

impl HttpDecompositionService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Service(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), SVD_ENDPOINT),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DecompositionService for HttpDecompositionService {
    async fn decompose(&self, image: Vec<u8>, file_name: String, dims: Dimensions) -> Result<Bytes> {
        let image_bytes = image.len();
        let form = Form::new()
            .part("image", Part::bytes(image).file_name(file_name))
            .text("width", dims.width.to_string())
            .text("height", dims.height.to_string());

        debug!(
            endpoint = %self.endpoint,
            image_bytes,
            width = dims.width,
            height = dims.height,
            "Requesting decomposition"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Service(format!("Request to {} failed: {}", self.endpoint, e)))?;

        if !response.status().is_success() {
            return Err(Error::Service(format!(
                "{} returned error status: {}",
                self.endpoint,
                response.status()
            )));
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| Error::Service(format!("Failed to read response body: {}", e)))?;

        info!(bytes = payload.len(), "Decomposition received");
        Ok(payload)
    }
}

/// Factor an image through `service` and upload the result
pub async fn upload_image<S: DecompositionService + ?Sized>(
    service: &S,
    orchestrator: &mut Orchestrator,
    image: Vec<u8>,
    file_name: String,
    dims: Dimensions,
) -> Result<Uuid> {
    let payload = service.decompose(image, file_name, dims).await?;
    orchestrator.upload(&payload, dims.width, dims.height).await
}

use async_trait::async_trait;
use bytes::Bytes;
use instagate_core::StorageError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Fixed timeout for a single object download.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRequest {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct ObjectResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ObjectResponse {
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }
}

/// Issues object GETs against remote storage.
///
/// Only transport-level failures are errors; an HTTP error status comes back
/// as a normal response for the caller to judge.
#[async_trait]
pub trait StorageTransport: Send + Sync {
    async fn get(&self, request: &ObjectRequest) -> Result<ObjectResponse, StorageError>;
}

#[derive(Debug, Clone)]
pub struct HttpStorageTransport {
    http_client: Client,
}

impl HttpStorageTransport {
    pub fn new() -> Result<Self, StorageError> {
        let http_client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl StorageTransport for HttpStorageTransport {
    async fn get(&self, request: &ObjectRequest) -> Result<ObjectResponse, StorageError> {
        let response = self
            .http_client
            .get(&request.url)
            .bearer_auth(&request.service_key)
            .header("apikey", &request.service_key)
            .send()
            .await
            .map_err(|e| {
                error!("Storage request to {} failed: {}", request.url, e);
                e
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("Storage responded {} ({} bytes)", status, body.len());

        Ok(ObjectResponse { status, body })
    }
}

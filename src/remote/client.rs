//! HTTP client for the memory service

use super::types::*;
use super::{BestEffort, RemoteMemory};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memory service client over HTTP
#[derive(Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base: Arc<RwLock<String>>,
}

impl HttpRemote {
    /// Create a client for the service at `base`
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: Arc::new(RwLock::new(normalize_base(base.into()))),
        }
    }

    /// Current service base URL
    pub async fn base(&self) -> String {
        self.base.read().await.clone()
    }

    /// Point the client at another service
    pub async fn set_base(&self, base: impl Into<String>) {
        *self.base.write().await = normalize_base(base.into());
    }

    async fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.read().await, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path).await;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("GET {} failed: {}", url, e)))?;
        decode(response, "GET", &url).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path).await;
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("POST {} failed: {}", url, e)))?;
        decode(response, "POST", &url).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get_json("/health").await
    }

    /// `GET /gates`
    pub async fn gates(&self) -> Result<Vec<GateInfo>> {
        let response: GatesResponse = self.get_json("/gates").await?;
        Ok(response.gates)
    }

    /// `GET /memory?limit=N`
    pub async fn list_memory(&self, limit: usize) -> Result<Vec<MemoryItem>> {
        let response: MemoryList = self.get_json(&format!("/memory?limit={}", limit)).await?;
        Ok(response.items)
    }

    /// `POST /memory`
    pub async fn save_memory(&self, entry: &NewMemory) -> Result<SavedMemory> {
        self.post_json("/memory", entry).await
    }

    /// `POST /tolls/pay`
    pub async fn pay(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        self.post_json("/tolls/pay", request).await
    }
}

#[async_trait]
impl RemoteMemory for HttpRemote {
    async fn save(&self, entry: &NewMemory) -> BestEffort<SavedMemory> {
        let result = self.save_memory(entry).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Remote memory save failed; continuing offline");
        }
        BestEffort::from_result(result)
    }

    async fn recent(&self, limit: usize) -> BestEffort<Vec<MemoryItem>> {
        let result = self.list_memory(limit).await;
        if let Err(e) = &result {
            tracing::debug!(error = %e, "Remote memory list unavailable");
        }
        BestEffort::from_result(result)
    }
}

fn normalize_base(base: String) -> String {
    base.trim().trim_end_matches('/').to_string()
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, method: &str, url: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(Error::Remote(format!("{} {} returned {}: {}", method, url, status, message)));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Remote(format!("Failed to parse response from {}: {}", url, e)))
}

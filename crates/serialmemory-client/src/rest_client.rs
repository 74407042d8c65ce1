use crate::provider::MemoryProvider;
use crate::types::{AddMemoryRequest, MemoryRecord, SearchRequest, SearchResponse, UpdateMemoryRequest};
use async_trait::async_trait;
use rag_domain::config::MemoryConfig;
use rag_domain::error::{Error, Result};
use std::time::Duration;
use uuid::Uuid;

/// Talks to the primary semantic-memory service over REST.
pub struct RestMemoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestMemoryClient {
    pub fn new(cfg: &MemoryConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_millis(cfg.timeout_ms));
        if let Some(api_key) = &cfg.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| Error::Other(format!("invalid api key header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Other(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn unavailable(e: reqwest::Error) -> Error {
        Error::ServiceUnavailable {
            message: format!("primary memory service: {e}"),
            details: serde_json::Value::Null,
        }
    }
}

#[async_trait]
impl MemoryProvider for RestMemoryClient {
    async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
        let resp = self
            .http
            .post(format!("{}/api/rag/search", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(Self::unavailable)?;
        resp.json::<SearchResponse>().await.map_err(Self::unavailable)
    }

    async fn add(&self, req: AddMemoryRequest) -> Result<MemoryRecord> {
        let resp = self
            .http
            .post(format!("{}/api/memories", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(Self::unavailable)?;
        resp.json::<MemoryRecord>().await.map_err(Self::unavailable)
    }

    async fn update(&self, req: UpdateMemoryRequest) -> Result<MemoryRecord> {
        let resp = self
            .http
            .patch(format!("{}/api/memories/{}", self.base_url, req.memory_id))
            .json(&req)
            .send()
            .await
            .map_err(Self::unavailable)?;
        resp.json::<MemoryRecord>().await.map_err(Self::unavailable)
    }

    async fn delete(&self, tenant_id: Uuid, user_id: Uuid, memory_id: &str) -> Result<()> {
        self.http
            .delete(format!("{}/api/memories/{memory_id}", self.base_url))
            .query(&[("tenant_id", tenant_id.to_string()), ("user_id", user_id.to_string())])
            .send()
            .await
            .map_err(Self::unavailable)?;
        Ok(())
    }
}

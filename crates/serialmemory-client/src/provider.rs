use crate::types::{AddMemoryRequest, MemoryRecord, SearchRequest, SearchResponse, UpdateMemoryRequest};
use async_trait::async_trait;
use rag_domain::error::Result;
use uuid::Uuid;

/// Abstraction over the primary semantic-memory service. The coordinator
/// is the only caller; it is what adds the fallback/health/write-queue
/// behavior this trait itself does not know about.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    async fn search(&self, req: SearchRequest) -> Result<SearchResponse>;
    async fn add(&self, req: AddMemoryRequest) -> Result<MemoryRecord>;
    async fn update(&self, req: UpdateMemoryRequest) -> Result<MemoryRecord>;
    async fn delete(&self, tenant_id: Uuid, user_id: Uuid, memory_id: &str) -> Result<()>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// One ranked hit. `relevance_score` is always populated before a
/// `SearchResponse` leaves the coordinator: the primary path normalizes it
/// via position-decay when the upstream service omits one, and the
/// fallback path derives it from keyword overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub record: MemoryRecord,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    #[serde(default = "d_limit")]
    pub limit: u32,
    /// Session the search is running within, used by context-aware ranking
    /// to boost results that touch the same topics as the active session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Restrict results to a single memory id (§4.8 fallback `memory_key` filter).
    #[serde(default)]
    pub memory_key: Option<String>,
    /// Restrict results to records created within `[from, to]`.
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
}

fn d_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub results: Vec<ScoredMemory>,
    pub source: MemorySource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    #[default]
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemoryRequest {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemoryOutcome {
    pub record: MemoryRecord,
    pub source: MemorySource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemoryRequest {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub memory_id: String,
    pub content: String,
}

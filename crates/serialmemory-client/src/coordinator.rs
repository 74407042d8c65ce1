use crate::provider::MemoryProvider;
use crate::types::{
    AddMemoryOutcome, AddMemoryRequest, MemoryRecord, MemorySource, ScoredMemory, SearchRequest,
    SearchResponse, UpdateMemoryRequest,
};
use chrono::Utc;
use rag_domain::error::Error;
use rag_domain::role::Role;
use rag_domain::trace::TraceEvent;
use rag_kv::{keys, KvStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthState {
    Healthy,
    Degraded,
}

/// Fronts the primary memory service with a key-value fallback.
///
/// While the primary is healthy, every call goes straight through. On
/// failure the tenant is marked degraded, the operation is served (reads)
/// or queued (writes) against the fallback store, and a background drain
/// retries the primary with an exponential backoff schedule until it
/// recovers, at which point queued writes replay in order.
pub struct MemoryCoordinator {
    primary: Arc<dyn MemoryProvider>,
    fallback: Arc<dyn KvStore>,
    health: parking_lot::Mutex<HashMap<Uuid, HealthState>>,
    /// Per-tenant drain lock: §5's "a single drainer runs at a time per
    /// tenant" rule, generalized from the session-lock-map pattern.
    drain_locks: parking_lot::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    backoff_schedule: Vec<u64>,
    fallback_ttl: Duration,
}

impl MemoryCoordinator {
    pub fn new(
        primary: Arc<dyn MemoryProvider>,
        fallback: Arc<dyn KvStore>,
        backoff_schedule: Vec<u64>,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            health: parking_lot::Mutex::new(HashMap::new()),
            drain_locks: parking_lot::Mutex::new(HashMap::new()),
            backoff_schedule,
            fallback_ttl,
        }
    }

    /// A request may read or write another user's memory only as a
    /// tenant-level (or platform-level) admin. `UberAdmin` is exempt by
    /// the same rule every other bypass in this workspace follows.
    pub fn check_access(&self, role: Role, requester: Uuid, target: Uuid) -> Result<(), Error> {
        if role == Role::TenantAdmin || role == Role::UberAdmin || requester == target {
            Ok(())
        } else {
            Err(Error::MemoryAccess {
                message: "caller may not access another user's memory".into(),
                details: serde_json::json!({ "requester": requester.to_string(), "target": target.to_string() }),
            })
        }
    }

    fn mark_degraded(&self, tenant_id: Uuid, reason: &str) {
        let mut health = self.health.lock();
        if health.insert(tenant_id, HealthState::Degraded) != Some(HealthState::Degraded) {
            TraceEvent::PrimaryMemoryDegraded {
                tenant_id: tenant_id.to_string(),
                reason: reason.to_string(),
            }
            .emit();
        }
    }

    async fn mark_healthy(&self, tenant_id: Uuid) {
        let was_degraded = {
            let mut health = self.health.lock();
            health.insert(tenant_id, HealthState::Healthy) == Some(HealthState::Degraded)
        };
        if was_degraded {
            TraceEvent::PrimaryMemoryRecovered {
                tenant_id: tenant_id.to_string(),
            }
            .emit();
            self.drain(tenant_id).await;
        }
    }

    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, Error> {
        match self.primary.search(req.clone()).await {
            Ok(mut resp) => {
                self.mark_healthy(req.tenant_id).await;
                normalize_position_decay(&mut resp.results);
                Ok(resp)
            }
            Err(e) => {
                self.mark_degraded(req.tenant_id, &e.to_string());
                self.search_fallback(&req).await
            }
        }
    }

    async fn search_fallback(&self, req: &SearchRequest) -> Result<SearchResponse, Error> {
        let pattern = keys::user_memory_scan_pattern(req.tenant_id, req.user_id);
        let matched_keys = self.fallback.scan(&pattern).await?;

        let query_tokens: Vec<String> = tokenize(&req.query);
        let mut scored = Vec::new();
        for key in matched_keys {
            let Some(raw) = self.fallback.get(&key).await? else {
                continue;
            };
            let Ok(record) = serde_json::from_str::<MemoryRecord>(&raw) else {
                continue;
            };

            if let Some(want) = &req.memory_key {
                if &record.id != want {
                    continue;
                }
            }
            if let Some(from) = req.created_after {
                if record.created_at < from {
                    continue;
                }
            }
            if let Some(to) = req.created_before {
                if record.created_at > to {
                    continue;
                }
            }

            let score = keyword_overlap_score(&query_tokens, &record.content);
            scored.push(ScoredMemory {
                record,
                relevance_score: score,
            });
        }

        scored.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
        scored.truncate(req.limit.max(1) as usize);

        Ok(SearchResponse {
            results: scored,
            source: MemorySource::Fallback,
        })
    }

    pub async fn add(&self, req: AddMemoryRequest) -> Result<AddMemoryOutcome, Error> {
        match self.primary.add(req.clone()).await {
            Ok(record) => {
                self.mark_healthy(req.tenant_id).await;
                Ok(AddMemoryOutcome {
                    record,
                    source: MemorySource::Primary,
                })
            }
            Err(e) => {
                self.mark_degraded(req.tenant_id, &e.to_string());
                let record = self.queue_write(&req).await?;
                Ok(AddMemoryOutcome {
                    record,
                    source: MemorySource::Fallback,
                })
            }
        }
    }

    async fn queue_write(&self, req: &AddMemoryRequest) -> Result<MemoryRecord, Error> {
        let mut metadata = req.metadata.clone();
        if !metadata.is_object() {
            metadata = serde_json::json!({});
        }
        metadata["source"] = serde_json::json!("fallback");

        let record = MemoryRecord {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            tenant_id: req.tenant_id,
            content: req.content.clone(),
            tags: req.tags.clone(),
            metadata,
            created_at: Utc::now(),
        };

        let record_key = keys::user_memory_key(req.tenant_id, req.user_id, &record.id);
        let payload = serde_json::to_string(&record)?;
        self.fallback
            .set(&record_key, &payload, Some(self.fallback_ttl))
            .await?;

        let queue_key = keys::write_queue_key(req.tenant_id);
        self.fallback.lpush(&queue_key, &payload).await?;

        Ok(record)
    }

    pub async fn update(&self, req: UpdateMemoryRequest) -> Result<MemoryRecord, Error> {
        self.primary.update(req).await
    }

    pub async fn delete(&self, tenant_id: Uuid, user_id: Uuid, memory_id: &str) -> Result<(), Error> {
        self.primary.delete(tenant_id, user_id, memory_id).await
    }

    /// Replays queued fallback writes against the primary, in FIFO order,
    /// retrying each entry with the configured backoff schedule before
    /// giving up on it for this drain pass. Only one drainer runs per
    /// tenant at a time; a recovery signal that arrives mid-drain is a
    /// no-op rather than a second concurrent drainer.
    async fn drain(&self, tenant_id: Uuid) {
        let lock = {
            let mut locks = self.drain_locks.lock();
            locks
                .entry(tenant_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let Ok(_guard) = lock.try_lock() else {
            return;
        };

        let queue_key = keys::write_queue_key(tenant_id);
        let Ok(entries) = self.fallback.lrange(&queue_key, 0, -1).await else {
            return;
        };
        let mut drained = 0usize;
        for raw in entries.iter().rev() {
            let Ok(record) = serde_json::from_str::<MemoryRecord>(raw) else {
                continue;
            };
            let req = AddMemoryRequest {
                tenant_id: record.tenant_id,
                user_id: record.user_id,
                content: record.content.clone(),
                tags: record.tags.clone(),
                metadata: record.metadata.clone(),
            };
            if self.retry_add(req).await {
                let _ = self.fallback.lrem(&queue_key, raw).await;
                drained += 1;
            } else {
                break;
            }
        }
        if drained > 0 {
            TraceEvent::WriteQueueDrained {
                tenant_id: tenant_id.to_string(),
                entries: drained,
            }
            .emit();
        }
    }

    async fn retry_add(&self, req: AddMemoryRequest) -> bool {
        for delay in &self.backoff_schedule {
            if self.primary.add(req.clone()).await.is_ok() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        self.primary.add(req).await.is_ok()
    }
}

/// Position-decay fallback for a primary response that does not carry its
/// own relevance scores: `1 − 0.1·rank`, clamped to `0`.
fn normalize_position_decay(results: &mut [ScoredMemory]) {
    for (rank, hit) in results.iter_mut().enumerate() {
        if hit.relevance_score <= 0.0 {
            hit.relevance_score = (1.0 - 0.1 * rank as f32).max(0.0);
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// `matches / max(1, |query_tokens|)`, per §4.8's fallback scoring rule.
fn keyword_overlap_score(query_tokens: &[String], content: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let content_tokens: std::collections::HashSet<String> = tokenize(content).into_iter().collect();
    let matches = query_tokens.iter().filter(|t| content_tokens.contains(*t)).count();
    matches as f32 / query_tokens.len().max(1) as f32
}

use chrono::Utc;
use rag_domain::error::Error;
use rag_domain::trace::TraceEvent;
use rag_kv::{keys, KvStore};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a rate-limit check, carrying the headers a handler surfaces
/// back to the caller regardless of whether the request was allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_time: i64,
    pub retry_after: u64,
}

/// Per-tenant sliding-window limiter backed by a `KvStore`'s sorted-set
/// commands. The window is a fixed wall-clock slice re-evaluated on every
/// call, not a fixed-bucket counter — entries older than the window are
/// pruned before counting.
pub struct RateLimiter {
    store: Arc<dyn KvStore>,
    limit: u64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KvStore>, limit: u64, window_secs: u64) -> Self {
        Self {
            store,
            limit,
            window_secs,
        }
    }

    pub async fn check(&self, tenant_id: Uuid) -> RateLimitDecision {
        self.check_at(tenant_id, Utc::now().timestamp()).await
    }

    /// Core algorithm, parameterized on `now` so it is deterministic under test.
    pub async fn check_at(&self, tenant_id: Uuid, now: i64) -> RateLimitDecision {
        match self.try_check_at(tenant_id, now).await {
            Ok(decision) => decision,
            Err(e) => {
                // Fail open: an unreachable rate-limit store must never block
                // the request path it is meant to protect.
                TraceEvent::RateLimitStoreUnavailable {
                    tenant_id: tenant_id.to_string(),
                    reason: e.to_string(),
                }
                .emit();
                RateLimitDecision {
                    allowed: true,
                    limit: self.limit,
                    remaining: self.limit.saturating_sub(1),
                    reset_time: now + self.window_secs as i64,
                    retry_after: 0,
                }
            }
        }
    }

    async fn try_check_at(&self, tenant_id: Uuid, now: i64) -> Result<RateLimitDecision, Error> {
        let key = keys::rate_limit_key(tenant_id);
        let window_start = (now - self.window_secs as i64) as f64;

        self.store.zremrangebyscore(&key, 0.0, window_start).await?;
        let count = self.store.zcard(&key).await?;

        if count >= self.limit {
            let reset_time = self.oldest_entry_reset(&key, now).await?;
            let retry_after = (reset_time - now).max(1) as u64;
            TraceEvent::RateLimited {
                tenant_id: tenant_id.to_string(),
                limit: self.limit,
                retry_after,
            }
            .emit();
            return Ok(RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_time,
                retry_after,
            });
        }

        self.store.zadd(&key, &now.to_string(), now as f64).await?;
        self.store
            .expire(&key, Duration::from_secs(self.window_secs + 60))
            .await?;
        let reset_time = self.oldest_entry_reset(&key, now).await?;

        Ok(RateLimitDecision {
            allowed: true,
            limit: self.limit,
            remaining: self.limit - count - 1,
            reset_time,
            retry_after: 0,
        })
    }

    async fn oldest_entry_reset(&self, key: &str, now: i64) -> Result<i64, Error> {
        let oldest = self.store.zrange_withscores(key, 0, 0).await?;
        Ok(match oldest.first() {
            Some((_, score)) => *score as i64 + self.window_secs as i64,
            None => now + self.window_secs as i64,
        })
    }
}

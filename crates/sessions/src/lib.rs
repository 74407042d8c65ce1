use chrono::{DateTime, Utc};
use rag_domain::error::Error;
use rag_domain::trace::TraceEvent;
use rag_kv::{keys, KvStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);
const DEFAULT_CLEANUP_THRESHOLD_SECS: i64 = 48 * 3600;

/// Per-`(tenant, user, session)` conversation context. Mirrors the wire
/// shape a `rag_resume_session`/`rag_interrupt_session` caller reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnvelope {
    pub session_id: String,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub conversation_state: Map<String, Value>,
    #[serde(default)]
    pub interrupted_queries: Vec<String>,
    #[serde(default)]
    pub recent_interactions: Vec<Value>,
    #[serde(default)]
    pub user_preferences: Map<String, Value>,
    pub stored_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Fields a caller supplies to `store`/`update`; anything omitted keeps its
/// prior value (or the empty default on a fresh `store`).
#[derive(Debug, Clone, Default)]
pub struct SessionFields {
    pub conversation_state: Option<Map<String, Value>>,
    pub interrupted_queries: Option<Vec<String>>,
    pub recent_interactions: Option<Vec<Value>>,
    pub user_preferences: Option<Map<String, Value>>,
}

/// Outcome of `resume_session`.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeOutcome {
    pub restored_context: SessionEnvelope,
    pub interrupted_queries: Vec<String>,
    pub can_resume: bool,
}

pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    default_ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(kv: Arc<dyn KvStore>, default_ttl: Duration) -> Self {
        Self { kv, default_ttl }
    }

    /// Writes the full envelope, overwriting any existing value.
    pub async fn store(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
        fields: SessionFields,
        ttl: Option<Duration>,
    ) -> Result<SessionEnvelope, Error> {
        let now = Utc::now();
        let envelope = SessionEnvelope {
            session_id: session_id.to_string(),
            tenant_id,
            user_id,
            conversation_state: fields.conversation_state.unwrap_or_default(),
            interrupted_queries: fields.interrupted_queries.unwrap_or_default(),
            recent_interactions: fields.recent_interactions.unwrap_or_default(),
            user_preferences: fields.user_preferences.unwrap_or_default(),
            stored_at: now,
            last_updated: now,
        };
        self.write(tenant_id, user_id, session_id, &envelope, ttl).await?;
        TraceEvent::SessionResolved {
            session_id: session_id.to_string(),
            is_new: true,
        }
        .emit();
        Ok(envelope)
    }

    pub async fn get(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Option<SessionEnvelope>, Error> {
        let key = keys::session_key(tenant_id, user_id, session_id);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    /// Read-modify-write with the merge rules in the session continuity
    /// contract: `conversation_state`/`user_preferences` are shallow-merged
    /// (new keys win), lists are concatenated in arrival order, `stored_at`
    /// is preserved and `last_updated` refreshed. Degenerates to `store`
    /// when no prior envelope exists.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
        fields: SessionFields,
        ttl: Option<Duration>,
    ) -> Result<SessionEnvelope, Error> {
        let Some(mut existing) = self.get(tenant_id, user_id, session_id).await? else {
            return self.store(tenant_id, user_id, session_id, fields, ttl).await;
        };

        if let Some(new_state) = fields.conversation_state {
            for (k, v) in new_state {
                existing.conversation_state.insert(k, v);
            }
        }
        if let Some(new_prefs) = fields.user_preferences {
            for (k, v) in new_prefs {
                existing.user_preferences.insert(k, v);
            }
        }
        if let Some(mut queries) = fields.interrupted_queries {
            existing.interrupted_queries.append(&mut queries);
            let mut seen = std::collections::HashSet::new();
            existing.interrupted_queries.retain(|q| seen.insert(q.clone()));
        }
        if let Some(mut interactions) = fields.recent_interactions {
            existing.recent_interactions.append(&mut interactions);
        }
        existing.last_updated = Utc::now();

        self.write(tenant_id, user_id, session_id, &existing, ttl).await?;
        Ok(existing)
    }

    /// Records an in-flight query as interrupted and merges it into
    /// `interrupted_queries` through `update`. Skips re-adding the query if
    /// it's already the most recently recorded one, so interrupting the
    /// same in-flight query twice (e.g. a retried request) doesn't produce
    /// a duplicate entry.
    pub async fn interrupt_session(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
        current_query: &str,
    ) -> Result<SessionEnvelope, Error> {
        let now = Utc::now();
        let mut conversation_state = Map::new();
        conversation_state.insert("interrupted".into(), Value::Bool(true));
        conversation_state.insert("interrupted_at".into(), Value::String(now.to_rfc3339()));

        let already_recorded = self
            .get(tenant_id, user_id, session_id)
            .await?
            .map(|existing| existing.interrupted_queries.iter().any(|q| q == current_query))
            .unwrap_or(false);

        let envelope = self
            .update(
                tenant_id,
                user_id,
                session_id,
                SessionFields {
                    conversation_state: Some(conversation_state),
                    interrupted_queries: if already_recorded {
                        None
                    } else {
                        Some(vec![current_query.to_string()])
                    },
                    ..Default::default()
                },
                None,
            )
            .await?;

        TraceEvent::SessionInterrupted {
            session_id: session_id.to_string(),
        }
        .emit();
        Ok(envelope)
    }

    /// 404s if no envelope exists rather than fabricating one. Otherwise
    /// marks the envelope resumed, writes it back, and reports whether the
    /// session actually has anything to resume from.
    pub async fn resume_session(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<ResumeOutcome, Error> {
        self.get(tenant_id, user_id, session_id)
            .await?
            .ok_or_else(|| Error::ResourceNotFound {
                message: format!("no session found for \"{session_id}\""),
                details: serde_json::json!({ "session_id": session_id }),
            })?;

        let now = Utc::now();
        let mut conversation_state = Map::new();
        conversation_state.insert("resumed".into(), Value::Bool(true));
        conversation_state.insert("resumed_at".into(), Value::String(now.to_rfc3339()));

        let restored_context = self
            .update(
                tenant_id,
                user_id,
                session_id,
                SessionFields {
                    conversation_state: Some(conversation_state),
                    ..Default::default()
                },
                None,
            )
            .await?;

        let interrupted_queries = restored_context.interrupted_queries.clone();
        let can_resume = !interrupted_queries.is_empty();

        TraceEvent::SessionResumed {
            session_id: session_id.to_string(),
        }
        .emit();

        Ok(ResumeOutcome {
            restored_context,
            interrupted_queries,
            can_resume,
        })
    }

    /// Scans every per-user key under the tenant, keeps the session-shaped
    /// ones, and deletes entries whose `last_updated` is older than
    /// `threshold_seconds` or whose payload does not parse.
    pub async fn cleanup(&self, tenant_id: Uuid, threshold_seconds: Option<i64>) -> Result<usize, Error> {
        let threshold = threshold_seconds.unwrap_or(DEFAULT_CLEANUP_THRESHOLD_SECS);
        let pattern = keys::tenant_user_scan_pattern(tenant_id);
        let candidates = self.kv.scan(&pattern).await?;
        let now = Utc::now();

        let mut deleted = 0;
        for key in candidates {
            if !key.contains(":session:") {
                continue;
            }
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            let stale = match serde_json::from_str::<SessionEnvelope>(&raw) {
                Ok(envelope) => (now - envelope.last_updated).num_seconds() > threshold,
                Err(_) => true,
            };
            if stale {
                self.kv.delete(&key).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn write(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        session_id: &str,
        envelope: &SessionEnvelope,
        ttl: Option<Duration>,
    ) -> Result<(), Error> {
        let key = keys::session_key(tenant_id, user_id, session_id);
        let payload = serde_json::to_string(envelope)?;
        self.kv.set(&key, &payload, Some(ttl.unwrap_or(self.default_ttl))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_kv::InMemoryKvStore;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemoryKvStore::new()))
    }

    #[tokio::test]
    async fn store_then_get_roundtrips() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        s.store(tenant_id, user_id, "sess-1", SessionFields::default(), None)
            .await
            .unwrap();
        let got = s.get(tenant_id, user_id, "sess-1").await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn get_missing_session_returns_none() {
        let s = store();
        let got = s.get(Uuid::new_v4(), Uuid::new_v4(), "nope").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn update_degenerates_to_store_when_no_prior_envelope() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let envelope = s
            .update(
                tenant_id,
                user_id,
                "sess-2",
                SessionFields {
                    conversation_state: Some(Map::from_iter([("topic".into(), Value::from("billing"))])),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(envelope.conversation_state["topic"], "billing");
    }

    #[tokio::test]
    async fn update_shallow_merges_conversation_state_with_new_keys_winning() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        s.store(
            tenant_id,
            user_id,
            "sess-3",
            SessionFields {
                conversation_state: Some(Map::from_iter([("topic".into(), Value::from("billing"))])),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

        let updated = s
            .update(
                tenant_id,
                user_id,
                "sess-3",
                SessionFields {
                    conversation_state: Some(Map::from_iter([("topic".into(), Value::from("refunds"))])),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.conversation_state["topic"], "refunds");
    }

    #[tokio::test]
    async fn update_concatenates_lists_and_preserves_stored_at() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let first = s
            .store(
                tenant_id,
                user_id,
                "sess-4",
                SessionFields {
                    recent_interactions: Some(vec![Value::from("hi")]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let updated = s
            .update(
                tenant_id,
                user_id,
                "sess-4",
                SessionFields {
                    recent_interactions: Some(vec![Value::from("again")]),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.recent_interactions.len(), 2);
        assert_eq!(updated.stored_at, first.stored_at);
    }

    #[tokio::test]
    async fn interrupt_session_deduplicates_queries_and_marks_state() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        s.interrupt_session(tenant_id, user_id, "sess-5", "Q1").await.unwrap();
        let envelope = s
            .interrupt_session(tenant_id, user_id, "sess-5", "Q1")
            .await
            .unwrap();
        assert_eq!(envelope.interrupted_queries, vec!["Q1".to_string()]);
        assert_eq!(envelope.conversation_state["interrupted"], true);
    }

    #[tokio::test]
    async fn interrupted_queries_keep_arrival_order_across_distinct_interrupts() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        s.interrupt_session(tenant_id, user_id, "sess-6", "Q2").await.unwrap();
        s.interrupt_session(tenant_id, user_id, "sess-6", "Q1").await.unwrap();
        let envelope = s.interrupt_session(tenant_id, user_id, "sess-6", "Q3").await.unwrap();
        assert_eq!(
            envelope.interrupted_queries,
            vec!["Q2".to_string(), "Q1".to_string(), "Q3".to_string()]
        );
    }

    #[tokio::test]
    async fn resume_session_404s_when_missing() {
        let s = store();
        let err = s
            .resume_session(Uuid::new_v4(), Uuid::new_v4(), "nope")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RESOURCE-001");
    }

    #[tokio::test]
    async fn resume_after_interrupt_can_resume_and_replays_queries() {
        let s = store();
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        s.interrupt_session(tenant_id, user_id, "sess-6", "Q1").await.unwrap();
        let outcome = s.resume_session(tenant_id, user_id, "sess-6").await.unwrap();
        assert!(outcome.can_resume);
        assert_eq!(outcome.interrupted_queries, vec!["Q1".to_string()]);
        assert_eq!(outcome.restored_context.conversation_state["resumed"], true);
    }

    #[tokio::test]
    async fn cleanup_deletes_entries_older_than_the_threshold() {
        let (tenant_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
        let mut envelope = SessionEnvelope {
            session_id: "sess-stale".into(),
            tenant_id,
            user_id,
            conversation_state: Map::new(),
            interrupted_queries: vec![],
            recent_interactions: vec![],
            user_preferences: Map::new(),
            stored_at: Utc::now(),
            last_updated: Utc::now(),
        };
        envelope.last_updated = Utc::now() - chrono::Duration::hours(72);
        let kv = InMemoryKvStore::new();
        let key = keys::session_key(tenant_id, user_id, "sess-stale");
        kv.set(&key, &serde_json::to_string(&envelope).unwrap(), None)
            .await
            .unwrap();
        let s = SessionStore::new(Arc::new(kv));
        let deleted = s.cleanup(tenant_id, None).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(s.get(tenant_id, user_id, "sess-stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cleanup_ignores_keys_outside_the_session_namespace() {
        let kv = InMemoryKvStore::new();
        let tenant_id = Uuid::new_v4();
        kv.set(&keys::cache_key(tenant_id, "tool_catalog", "default"), "{}", None)
            .await
            .unwrap();
        let s = SessionStore::new(Arc::new(kv));
        let deleted = s.cleanup(tenant_id, None).await.unwrap();
        assert_eq!(deleted, 0);
    }
}

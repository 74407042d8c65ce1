use crate::coordinator::MemoryCoordinator;
use crate::types::SearchRequest;
use rag_domain::error::Error;
use rag_domain::role::Role;
use rag_kv::{keys, KvStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSnapshot {
    is_returning_user: bool,
    memory_count: usize,
    greeting: String,
}

/// A greeting/context-summary snapshot for the start of a conversation,
/// cached for an hour so the same user opening a second session moments
/// later does not re-run a memory search to learn what it already knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecognitionSnapshot {
    pub is_returning_user: bool,
    pub memory_count: usize,
    pub greeting: String,
    pub cache_hit: bool,
}

/// Wraps the memory coordinator with a cached recognition read path.
/// `has_session_context` is supplied by the caller rather than looked up
/// here, so this crate does not need a dependency on the sessions crate.
pub struct UserRecognitionService {
    coordinator: Arc<MemoryCoordinator>,
    cache: Arc<dyn KvStore>,
}

impl UserRecognitionService {
    pub fn new(coordinator: Arc<MemoryCoordinator>, cache: Arc<dyn KvStore>) -> Self {
        Self { coordinator, cache }
    }

    pub async fn recognize(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
        has_session_context: bool,
    ) -> Result<UserRecognitionSnapshot, Error> {
        self.coordinator.check_access(role, user_id, user_id)?;

        let cache_key = keys::user_recognition_key(tenant_id, user_id);
        if let Some(raw) = self.cache.get(&cache_key).await? {
            if let Ok(cached) = serde_json::from_str::<CachedSnapshot>(&raw) {
                return Ok(UserRecognitionSnapshot {
                    is_returning_user: cached.is_returning_user,
                    memory_count: cached.memory_count,
                    greeting: cached.greeting,
                    cache_hit: true,
                });
            }
        }

        let resp = self
            .coordinator
            .search(SearchRequest {
                tenant_id,
                user_id,
                query: String::new(),
                limit: 5,
                session_id: None,
                memory_key: None,
                created_after: None,
                created_before: None,
            })
            .await?;

        let memory_count = resp.results.len();
        let is_returning_user = memory_count > 0;
        let greeting = greeting_for(is_returning_user, has_session_context);

        let cached = CachedSnapshot {
            is_returning_user,
            memory_count,
            greeting: greeting.clone(),
        };
        self.cache
            .set(&cache_key, &serde_json::to_string(&cached)?, Some(CACHE_TTL))
            .await?;

        Ok(UserRecognitionSnapshot {
            is_returning_user,
            memory_count,
            greeting,
            cache_hit: false,
        })
    }

    /// Drops the cached snapshot so the next `recognize` call recomputes it.
    /// Called after any write that could change what the next greeting says.
    pub async fn invalidate(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), Error> {
        let cache_key = keys::user_recognition_key(tenant_id, user_id);
        self.cache.delete(&cache_key).await
    }
}

fn greeting_for(is_returning_user: bool, has_session_context: bool) -> String {
    match (is_returning_user, has_session_context) {
        (true, true) => "Welcome back — picking up where we left off.".to_string(),
        (true, false) => "Welcome back.".to_string(),
        (false, _) => "Hi, nice to meet you.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use crate::types::{AddMemoryRequest, MemoryRecord, SearchResponse, UpdateMemoryRequest};
    use async_trait::async_trait;
    use rag_kv::InMemoryKvStore;

    struct EmptyPrimary;

    #[async_trait]
    impl MemoryProvider for EmptyPrimary {
        async fn search(&self, _req: SearchRequest) -> Result<SearchResponse, Error> {
            Ok(SearchResponse::default())
        }
        async fn add(&self, _req: AddMemoryRequest) -> Result<MemoryRecord, Error> {
            Err(Error::ServiceUnavailable {
                message: "not needed".into(),
                details: serde_json::Value::Null,
            })
        }
        async fn update(&self, _req: UpdateMemoryRequest) -> Result<MemoryRecord, Error> {
            unimplemented!()
        }
        async fn delete(&self, _tenant_id: Uuid, _user_id: Uuid, _memory_id: &str) -> Result<(), Error> {
            Ok(())
        }
    }

    fn service() -> UserRecognitionService {
        let coordinator = Arc::new(MemoryCoordinator::new(
            Arc::new(EmptyPrimary),
            Arc::new(InMemoryKvStore::new()),
            vec![0],
            Duration::from_secs(60),
        ));
        UserRecognitionService::new(coordinator, Arc::new(InMemoryKvStore::new()))
    }

    #[tokio::test]
    async fn first_call_is_a_cache_miss_for_a_new_user() {
        let svc = service();
        let snapshot = svc
            .recognize(Uuid::new_v4(), Uuid::new_v4(), Role::EndUser, false)
            .await
            .unwrap();
        assert!(!snapshot.cache_hit);
        assert!(!snapshot.is_returning_user);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let svc = service();
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        svc.recognize(tenant_id, user_id, Role::EndUser, false).await.unwrap();
        let second = svc.recognize(tenant_id, user_id, Role::EndUser, false).await.unwrap();
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn invalidate_forces_a_recompute_on_next_call() {
        let svc = service();
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        svc.recognize(tenant_id, user_id, Role::EndUser, false).await.unwrap();
        svc.invalidate(tenant_id, user_id).await.unwrap();
        let after = svc.recognize(tenant_id, user_id, Role::EndUser, false).await.unwrap();
        assert!(!after.cache_hit);
    }

    #[tokio::test]
    async fn returning_user_with_active_session_gets_a_continuity_greeting() {
        assert_eq!(
            greeting_for(true, true),
            "Welcome back — picking up where we left off."
        );
        assert_eq!(greeting_for(true, false), "Welcome back.");
        assert_eq!(greeting_for(false, true), "Hi, nice to meet you.");
    }
}

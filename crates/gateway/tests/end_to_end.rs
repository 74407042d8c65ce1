//! End-to-end scenarios over the full axum router, exercising the wire
//! shape the S1/S2/S4/S5 scenarios describe: real HTTP requests through
//! `tower::ServiceExt::oneshot`, real middleware, a hand-built `AppState`
//! so the primary memory service can be swapped for a controllable double.

use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rag_audit::{AuditSink, InMemoryAuditSink};
use rag_auth::{ApiKeyRecord, Authenticator, OpaqueKeyVerifier};
use rag_domain::config::Config;
use rag_domain::error::Result as DomainResult;
use rag_domain::role::Role;
use rag_gateway::repo::{InMemoryApiKeyRepository, InMemoryUserRepository};
use rag_gateway::state::AppState;
use rag_kv::{InMemoryKvStore, KvStore};
use rag_memory::{
    AddMemoryRequest, MemoryCoordinator, MemoryProvider, MemoryRecord, SearchRequest, SearchResponse,
    UpdateMemoryRequest, UserRecognitionService,
};
use rag_ratelimit::RateLimiter;
use rag_rbac::Authorizer;
use rag_sessions::SessionStore;
use rag_tenant::TenantExtractor;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

struct TogglePrimary {
    up: AtomicBool,
}

impl TogglePrimary {
    fn up() -> Arc<Self> {
        Arc::new(Self { up: AtomicBool::new(true) })
    }
    fn down() -> Arc<Self> {
        Arc::new(Self { up: AtomicBool::new(false) })
    }
}

#[async_trait]
impl MemoryProvider for TogglePrimary {
    async fn search(&self, req: SearchRequest) -> DomainResult<SearchResponse> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(rag_domain::error::Error::ServiceUnavailable {
                message: "primary down".into(),
                details: Value::Null,
            });
        }
        Ok(SearchResponse {
            results: vec![rag_memory::ScoredMemory {
                record: MemoryRecord {
                    id: "m1".into(),
                    user_id: req.user_id,
                    tenant_id: req.tenant_id,
                    content: "dark mode is enabled in settings".into(),
                    tags: vec![],
                    metadata: Value::Null,
                    created_at: chrono::Utc::now(),
                },
                relevance_score: 0.0,
            }],
            source: rag_memory::MemorySource::Primary,
        })
    }

    async fn add(&self, req: AddMemoryRequest) -> DomainResult<MemoryRecord> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(rag_domain::error::Error::ServiceUnavailable {
                message: "primary down".into(),
                details: Value::Null,
            });
        }
        Ok(MemoryRecord {
            id: Uuid::new_v4().to_string(),
            user_id: req.user_id,
            tenant_id: req.tenant_id,
            content: req.content,
            tags: req.tags,
            metadata: req.metadata,
            created_at: chrono::Utc::now(),
        })
    }

    async fn update(&self, req: UpdateMemoryRequest) -> DomainResult<MemoryRecord> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(rag_domain::error::Error::ServiceUnavailable {
                message: "primary down".into(),
                details: Value::Null,
            });
        }
        Ok(MemoryRecord {
            id: req.memory_id,
            user_id: req.user_id,
            tenant_id: req.tenant_id,
            content: req.content,
            tags: vec![],
            metadata: Value::Null,
            created_at: chrono::Utc::now(),
        })
    }

    async fn delete(&self, _tenant_id: Uuid, _user_id: Uuid, _memory_id: &str) -> DomainResult<()> {
        Ok(())
    }
}

fn hash_key(key: &str) -> String {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    Argon2::default().hash_password(key.as_bytes(), &salt).unwrap().to_string()
}

fn api_key_record(tenant_id: Uuid, key: &str, role: Role) -> ApiKeyRecord {
    ApiKeyRecord {
        tenant_id,
        key_digest: Sha256::digest(key.as_bytes()).into(),
        key_hash: hash_key(key),
        role,
        expires_at: None,
    }
}

/// Builds a fully wired `AppState` with a swappable primary memory provider
/// and one seeded tenant/user/API key, mirroring the teacher's preference
/// for hand-assembled test fixtures over a shared builder that hides wiring.
fn test_state(primary: Arc<dyn MemoryProvider>) -> (AppState, Uuid, Uuid, String) {
    let tenant_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let api_key = format!("test-key-{}", Uuid::new_v4());

    let user_repo = Arc::new(InMemoryUserRepository::new());
    user_repo.insert(user_id, tenant_id);

    let key_repo = Arc::new(InMemoryApiKeyRepository::new());
    key_repo.insert(api_key_record(tenant_id, &api_key, Role::EndUser), user_id);

    let audit: Arc<dyn AuditSink> = Arc::new(InMemoryAuditSink::new());
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());

    let authenticator = Arc::new(Authenticator::new(
        None,
        Some(OpaqueKeyVerifier::new(100)),
        Some(key_repo.clone() as Arc<dyn rag_auth::ApiKeyRepository>),
        audit.clone(),
        50,
    ));

    let tenant_extractor = Arc::new(TenantExtractor::new(user_repo.clone()));
    let authorizer = Arc::new(Authorizer::new(true));
    let rate_limiter = Arc::new(RateLimiter::new(kv.clone(), 1000, 60));
    let memory = Arc::new(MemoryCoordinator::new(
        primary,
        kv.clone(),
        vec![1, 2],
        Duration::from_secs(86_400),
    ));
    let sessions = Arc::new(SessionStore::with_default_ttl(kv.clone(), Duration::from_secs(3600)));
    let recognition = Arc::new(UserRecognitionService::new(memory.clone(), kv));

    let state = AppState {
        config: Arc::new(Config::default()),
        authenticator,
        tenant_extractor,
        authorizer,
        rate_limiter,
        audit,
        memory,
        sessions,
        recognition,
        user_repo,
        key_repo,
    };
    (state, tenant_id, user_id, api_key)
}

fn invoke_request(api_key: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/tools/invoke")
        .header("content-type", "application/json")
        .header("x-api-key", api_key)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn s1_happy_api_key_search_returns_200_with_results() {
    let (state, tenant_id, user_id, api_key) = test_state(TogglePrimary::up());
    let app = rag_gateway::router::build(state);

    let req = invoke_request(
        &api_key,
        json!({
            "tool": "mem0_search_memory",
            "params": { "user_id": user_id, "tenant_id": tenant_id, "search_query": "dark mode" }
        }),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn s2_cross_user_memory_access_is_403_data_002() {
    let (state, tenant_id, user_id, api_key) = test_state(TogglePrimary::up());
    let other_user = Uuid::new_v4();
    let app = rag_gateway::router::build(state);

    let req = invoke_request(
        &api_key,
        json!({
            "tool": "mem0_get_user_memory",
            "params": { "user_id": other_user, "tenant_id": tenant_id }
        }),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "DATA-002");
    let _ = user_id;
}

#[tokio::test]
async fn s6_uber_admin_cross_tenant_read_is_allowed() {
    let (state, home_tenant, _user_id, _api_key) = test_state(TogglePrimary::up());
    let other_tenant = Uuid::new_v4();

    let admin_user = Uuid::new_v4();
    let admin_key = format!("admin-key-{}", Uuid::new_v4());
    state.user_repo.insert(admin_user, home_tenant);
    state
        .key_repo
        .insert(api_key_record(home_tenant, &admin_key, Role::UberAdmin), admin_user);

    let app = rag_gateway::router::build(state);

    let req = invoke_request(
        &admin_key,
        json!({
            "tool": "mem0_search_memory",
            "params": { "tenant_id": other_tenant, "search_query": "dark mode" }
        }),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn s4_primary_down_add_falls_back_and_queues() {
    let (state, tenant_id, user_id, api_key) = test_state(TogglePrimary::down());
    let kv_for_assertions = state.memory.clone();
    let app = rag_gateway::router::build(state);

    let req = invoke_request(
        &api_key,
        json!({
            "tool": "mem0_update_memory",
            "params": { "user_id": user_id, "tenant_id": tenant_id, "memory_key": "k", "memory_value": "v" }
        }),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["created"], true);
    assert_eq!(body["result"]["source"], "fallback");
    let _ = kv_for_assertions;
}

#[tokio::test]
async fn s5_interrupt_then_resume_reports_can_resume() {
    let (state, tenant_id, user_id, api_key) = test_state(TogglePrimary::up());
    let app = rag_gateway::router::build(state);

    let interrupt = invoke_request(
        &api_key,
        json!({
            "tool": "rag_interrupt_session",
            "params": { "session_id": "S", "current_query": "Q1", "user_id": user_id, "tenant_id": tenant_id }
        }),
    );
    let resp = app.clone().oneshot(interrupt).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resume = invoke_request(
        &api_key,
        json!({
            "tool": "rag_resume_session",
            "params": { "session_id": "S", "user_id": user_id, "tenant_id": tenant_id }
        }),
    );
    let resp = app.oneshot(resume).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["can_resume"], true);
    assert_eq!(body["result"]["interrupted_queries"], json!(["Q1"]));
    assert_eq!(body["result"]["restored_context"]["conversation_state"]["resumed"], true);
}

#[tokio::test]
async fn missing_auth_is_401() {
    let (state, tenant_id, user_id, _api_key) = test_state(TogglePrimary::up());
    let app = rag_gateway::router::build(state);

    let req = Request::builder()
        .method("POST")
        .uri("/v1/tools/invoke")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "tool": "mem0_search_memory", "params": { "user_id": user_id, "tenant_id": tenant_id } })
                .to_string(),
        ))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_requires_no_auth() {
    let (state, ..) = test_state(TogglePrimary::up());
    let app = rag_gateway::router::build(state);
    let req = Request::builder().uri("/v1/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

//! Wires a `Config` into a running `AppState`. This is the one place that
//! knows about every crate in the workspace; everything downstream only
//! sees the trait objects and services it actually needs.

use std::sync::Arc;
use std::time::Duration;

use rag_audit::{AuditSink, ChannelAuditSink};
use rag_auth::{Authenticator, OAuthVerifier, OAuthVerifierConfig, OpaqueKeyVerifier};
use rag_domain::config::Config;
use rag_kv::{InMemoryKvStore, KvStore, RedisKvStore};
use rag_memory::{MemoryCoordinator, RestMemoryClient, UserRecognitionService};
use rag_ratelimit::RateLimiter;
use rag_rbac::Authorizer;
use rag_sessions::SessionStore;
use rag_tenant::TenantExtractor;

use crate::repo::{InMemoryApiKeyRepository, InMemoryUserRepository};
use crate::state::AppState;

/// `memory://` is an in-process-only scheme this workspace invents for
/// tests and single-node demos; anything else is handed to `redis::Client`
/// verbatim, matching `RedisKvStore::connect`'s own validation.
async fn build_kv_store(url: &str) -> anyhow::Result<Arc<dyn KvStore>> {
    if url.starts_with("memory://") {
        Ok(Arc::new(InMemoryKvStore::new()))
    } else {
        Ok(Arc::new(RedisKvStore::connect(url).await?))
    }
}

pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let config = Arc::new(config);

    let kv = build_kv_store(&config.kv.url).await?;
    let fallback = kv.clone();
    let rate_limit_store = kv.clone();
    let session_kv = kv.clone();
    let recognition_cache = kv;

    let audit: Arc<dyn AuditSink> = Arc::new(ChannelAuditSink::spawn(|event| {
        tracing::info!(
            action = %event.action,
            resource_type = %event.resource_type,
            success = event.success,
            tenant_id = ?event.tenant_id,
            user_id = ?event.user_id,
            "audit_event"
        );
    }));

    let user_repo = Arc::new(InMemoryUserRepository::new());
    let key_repo: Arc<InMemoryApiKeyRepository> = Arc::new(InMemoryApiKeyRepository::new());

    let oauth = if config.oauth.enabled {
        Some(OAuthVerifier::new(OAuthVerifierConfig {
            issuer: config.oauth.issuer.clone(),
            audience: config.oauth.audience.clone(),
            jwks_url: config.oauth.jwks_url.clone(),
            jwks_cache_ttl: Duration::from_secs(config.oauth.jwks_cache_ttl_secs),
            userinfo_url: config.oauth.userinfo_url.clone(),
            user_id_claim: config.oauth.user_id_claim.clone(),
            tenant_id_claim: config.oauth.tenant_id_claim.clone(),
            role_claim: config.oauth.role_claim.clone(),
        }))
    } else {
        None
    };

    let opaque = if config.opaque_key.enabled {
        Some(OpaqueKeyVerifier::new(config.opaque_key.scan_cap))
    } else {
        None
    };

    let authenticator = Arc::new(Authenticator::new(
        oauth,
        opaque,
        Some(key_repo.clone() as Arc<dyn rag_auth::ApiKeyRepository>),
        audit.clone(),
        config.oauth.auth_timeout_budget_ms,
    ));

    let tenant_extractor = Arc::new(TenantExtractor::new(user_repo.clone()));

    let authorizer = Arc::new(Authorizer::new(config.rbac.strict_mode));

    let rate_limiter = Arc::new(RateLimiter::new(
        rate_limit_store,
        config.rate_limit.requests_per_window,
        config.rate_limit.window_seconds,
    ));

    let primary = Arc::new(RestMemoryClient::new(&config.memory)?);
    let memory = Arc::new(MemoryCoordinator::new(
        primary,
        fallback,
        config.memory.backoff_schedule_ms.clone(),
        Duration::from_secs(config.memory.fallback_ttl_secs),
    ));

    let sessions = Arc::new(SessionStore::with_default_ttl(
        session_kv,
        Duration::from_secs(config.sessions.ttl_secs),
    ));

    let recognition = Arc::new(UserRecognitionService::new(memory.clone(), recognition_cache));

    Ok(AppState {
        config,
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
    })
}

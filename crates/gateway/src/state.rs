use std::sync::Arc;

use rag_audit::AuditSink;
use rag_auth::Authenticator;
use rag_domain::config::Config;
use rag_memory::{MemoryCoordinator, UserRecognitionService};
use rag_ratelimit::RateLimiter;
use rag_rbac::Authorizer;
use rag_sessions::SessionStore;
use rag_tenant::TenantExtractor;

use crate::repo::{InMemoryApiKeyRepository, InMemoryUserRepository};

/// Shared application state passed to every handler and middleware layer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub authenticator: Arc<Authenticator>,
    pub tenant_extractor: Arc<TenantExtractor<Arc<InMemoryUserRepository>>>,
    pub authorizer: Arc<Authorizer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub audit: Arc<dyn AuditSink>,
    pub memory: Arc<MemoryCoordinator>,
    pub sessions: Arc<SessionStore>,
    pub recognition: Arc<UserRecognitionService>,
    /// In-process stand-ins for the external relational store (see
    /// `repo.rs`), exposed so `doctor` and tests can seed fixtures.
    pub user_repo: Arc<InMemoryUserRepository>,
    pub key_repo: Arc<InMemoryApiKeyRepository>,
}

use crate::oauth::OAuthVerifier;
use crate::opaque::{ApiKeyRepository, OpaqueKeyVerifier};
use rag_audit::{AuditEvent, AuditSink};
use rag_domain::error::Error;
use rag_domain::role::{AuthMethod, Role};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub method: AuthMethod,
}

/// Orchestrates the two supported auth paths. OAuth is tried first when a
/// `Bearer` token is present and OAuth is enabled; the opaque API-key path
/// (read from `X-API-Key`) is the fallback. Every attempt — success or
/// failure, on either path — produces exactly one audit event.
pub struct Authenticator {
    oauth: Option<OAuthVerifier>,
    opaque: Option<OpaqueKeyVerifier>,
    repo: Option<Arc<dyn ApiKeyRepository>>,
    audit: Arc<dyn AuditSink>,
    timeout_budget_ms: u64,
}

impl Authenticator {
    pub fn new(
        oauth: Option<OAuthVerifier>,
        opaque: Option<OpaqueKeyVerifier>,
        repo: Option<Arc<dyn ApiKeyRepository>>,
        audit: Arc<dyn AuditSink>,
        timeout_budget_ms: u64,
    ) -> Self {
        Self {
            oauth,
            opaque,
            repo,
            audit,
            timeout_budget_ms,
        }
    }

    pub async fn authenticate(
        &self,
        bearer_token: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<AuthOutcome, Error> {
        let started = Instant::now();

        if let (Some(verifier), Some(token)) = (self.oauth.as_ref(), bearer_token) {
            match verifier.verify(token).await {
                Ok(claims) => {
                    self.log_attempt(
                        Some(claims.tenant_id),
                        Some(claims.user_id),
                        Some(claims.role),
                        "oauth",
                        true,
                    );
                    self.warn_if_slow(started, "oauth");
                    return Ok(AuthOutcome {
                        tenant_id: claims.tenant_id,
                        user_id: claims.user_id,
                        role: claims.role,
                        method: AuthMethod::OAuth,
                    });
                }
                Err(e) if api_key.is_none() || self.opaque.is_none() => {
                    self.log_attempt(None, None, None, "oauth", false);
                    return Err(e);
                }
                Err(_) => {
                    // fall through to the API-key path
                }
            }
        }

        if let (Some(verifier), Some(key), Some(repo)) =
            (self.opaque.as_ref(), api_key, self.repo.as_ref())
        {
            match verifier.verify(key, repo.as_ref()).await {
                Ok((tenant_id, user_id, role)) => {
                    self.log_attempt(Some(tenant_id), Some(user_id), Some(role), "api_key", true);
                    self.warn_if_slow(started, "api_key");
                    return Ok(AuthOutcome {
                        tenant_id,
                        user_id,
                        role,
                        method: AuthMethod::ApiKey,
                    });
                }
                Err(e) => {
                    self.log_attempt(None, None, None, "api_key", false);
                    return Err(e);
                }
            }
        }

        self.log_attempt(None, None, None, "none", false);
        Err(Error::Authentication {
            message: "no authentication method succeeded; provide a Bearer token or X-API-Key".into(),
            details: serde_json::Value::Null,
            recovery_suggestions: vec!["authenticate with a valid OAuth token or API key".into()],
        })
    }

    fn warn_if_slow(&self, started: Instant, method: &str) {
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > self.timeout_budget_ms {
            tracing::warn!(method, elapsed_ms = elapsed, budget_ms = self.timeout_budget_ms, "authentication exceeded its latency budget");
        }
    }

    fn log_attempt(
        &self,
        tenant_id: Option<Uuid>,
        user_id: Option<Uuid>,
        role: Option<Role>,
        method: &str,
        success: bool,
    ) {
        let action = if success { "authenticate" } else { "authenticate_failed" };
        let mut event = AuditEvent::new(action, "authentication", success)
            .details(serde_json::json!({ "method": method }));
        if let Some(t) = tenant_id {
            event = event.tenant(t);
        }
        if let Some(u) = user_id {
            event = event.user(u);
        }
        if let Some(r) = role {
            event = event.role(r);
        }
        self.audit.record(event);
    }
}

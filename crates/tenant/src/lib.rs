use async_trait::async_trait;
use rag_auth::AuthOutcome;
use rag_domain::context::RequestContext;
use rag_domain::error::Error;
use rag_domain::role::Role;
use rag_domain::trace::TraceEvent;
use uuid::Uuid;

/// One row of the membership table the extractor checks against: the
/// tenant a user actually belongs to, as stored on the relational side.
#[derive(Debug, Clone, Copy)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
}

/// Looks a user up by id. The relational store itself is an external
/// concern; this crate only needs the membership fact it returns.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, Error>;
}

#[async_trait]
impl<T: UserRepository + ?Sized> UserRepository for std::sync::Arc<T> {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, Error> {
        (**self).find_user(user_id).await
    }
}

/// Establishes tenant scope for a request: confirms the authenticated
/// user actually belongs to the tenant it claims, then hands back the
/// `RequestContext` every downstream component reads from.
pub struct TenantExtractor<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> TenantExtractor<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// `UBER_ADMIN` skips the membership check entirely — it is not scoped
    /// to any one tenant. Every other role must belong to the tenant it
    /// authenticated as, confirmed against the user repository.
    pub async fn extract(&self, request_id: Uuid, auth: &AuthOutcome) -> Result<RequestContext, Error> {
        if auth.role != Role::UberAdmin {
            let record = self.repo.find_user(auth.user_id).await?;
            match record {
                Some(record) if record.tenant_id == auth.tenant_id => {}
                _ => {
                    return Err(Error::TenantValidation {
                        message: format!(
                            "user {} is not a member of tenant {}",
                            auth.user_id, auth.tenant_id
                        ),
                        details: serde_json::json!({
                            "user_id": auth.user_id.to_string(),
                            "claimed_tenant_id": auth.tenant_id.to_string(),
                        }),
                    });
                }
            }
        }

        TraceEvent::TenantValidated {
            tenant_id: auth.tenant_id.to_string(),
        }
        .emit();

        Ok(RequestContext {
            request_id,
            tenant_id: auth.tenant_id,
            user_id: auth.user_id,
            role: auth.role,
            auth_method: auth.method,
        })
    }
}

/// Hook for row-level isolation in a relational store: some backends set a
/// session-local variable (e.g. Postgres `SET LOCAL app.tenant_id`) that a
/// row-level security policy reads on every query. That mechanism lives
/// entirely on the database side, so this workspace only models the call
/// site: a no-op default plus a recording double for tests that need to
/// assert the scope was actually set before a query ran.
pub trait TenantScope: Send + Sync {
    fn set_scope(&self, tenant_id: Uuid);
}

/// Default scope for backends with no session-local isolation primitive.
pub struct NoopTenantScope;

impl TenantScope for NoopTenantScope {
    fn set_scope(&self, _tenant_id: Uuid) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct RecordingTenantScope {
        seen: std::sync::Mutex<Vec<Uuid>>,
    }

    impl RecordingTenantScope {
        fn new() -> Self {
            Self {
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl TenantScope for RecordingTenantScope {
        fn set_scope(&self, tenant_id: Uuid) {
            self.seen.lock().unwrap().push(tenant_id);
        }
    }

    #[test]
    fn noop_scope_accepts_any_tenant_without_recording() {
        let scope = NoopTenantScope;
        scope.set_scope(Uuid::new_v4());
    }

    #[test]
    fn recording_scope_captures_the_tenant_set_before_a_query() {
        let scope = RecordingTenantScope::new();
        let tenant_id = Uuid::new_v4();
        scope.set_scope(tenant_id);
        assert_eq!(scope.seen.lock().unwrap().as_slice(), [tenant_id]);
    }

    struct FakeRepo(HashMap<Uuid, Uuid>);

    #[async_trait]
    impl UserRepository for FakeRepo {
        async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, Error> {
            Ok(self.0.get(&user_id).map(|tenant_id| UserRecord {
                user_id,
                tenant_id: *tenant_id,
            }))
        }
    }

    fn outcome(tenant_id: Uuid, user_id: Uuid, role: Role) -> AuthOutcome {
        AuthOutcome {
            tenant_id,
            user_id,
            role,
            method: rag_domain::role::AuthMethod::OAuth,
        }
    }

    #[tokio::test]
    async fn matching_membership_publishes_the_request_context() {
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let repo = FakeRepo(HashMap::from([(user_id, tenant_id)]));
        let extractor = TenantExtractor::new(repo);

        let ctx = extractor
            .extract(Uuid::new_v4(), &outcome(tenant_id, user_id, Role::EndUser))
            .await
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant_id);
        assert_eq!(ctx.user_id, user_id);
    }

    #[tokio::test]
    async fn mismatched_tenant_fails_tenant_validation() {
        let claimed_tenant = Uuid::new_v4();
        let actual_tenant = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let repo = FakeRepo(HashMap::from([(user_id, actual_tenant)]));
        let extractor = TenantExtractor::new(repo);

        let err = extractor
            .extract(Uuid::new_v4(), &outcome(claimed_tenant, user_id, Role::EndUser))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERROR-003");
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_user_record_fails_tenant_validation() {
        let repo = FakeRepo(HashMap::new());
        let extractor = TenantExtractor::new(repo);

        let err = extractor
            .extract(
                Uuid::new_v4(),
                &outcome(Uuid::new_v4(), Uuid::new_v4(), Role::EndUser),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ERROR-003");
    }

    #[tokio::test]
    async fn uber_admin_skips_the_membership_check() {
        let repo = FakeRepo(HashMap::new());
        let extractor = TenantExtractor::new(repo);

        let ctx = extractor
            .extract(
                Uuid::new_v4(),
                &outcome(Uuid::new_v4(), Uuid::new_v4(), Role::UberAdmin),
            )
            .await
            .unwrap();
        assert_eq!(ctx.role, Role::UberAdmin);
    }
}

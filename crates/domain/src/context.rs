use crate::role::{AuthMethod, Role};
use serde_json::Value;
use uuid::Uuid;

/// Ambient, immutable identity for the request currently being handled.
///
/// Written exactly once, by the tenant-extraction middleware, after
/// authentication succeeds. Every downstream component — authorizer, rate
/// limiter, memory coordinator, audit sink — reads this instead of
/// threading five parameters through every call.
///
/// No global singleton: the value lives in a [`tokio::task_local!`] scoped
/// for the lifetime of the task handling one request. A handler that reads
/// outside an active scope gets a hard error, never a silent default — see
/// [`current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub auth_method: AuthMethod,
}

impl RequestContext {
    pub fn new(
        request_id: Uuid,
        tenant_id: Uuid,
        user_id: Uuid,
        role: Role,
        auth_method: AuthMethod,
    ) -> Self {
        Self {
            request_id,
            tenant_id,
            user_id,
            role,
            auth_method,
        }
    }

    pub fn audit_actor(&self) -> Value {
        serde_json::json!({
            "user_id": self.user_id,
            "tenant_id": self.tenant_id,
            "role": self.role.as_str(),
        })
    }
}

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Run `fut` with `ctx` bound as the ambient context for its duration.
pub async fn scope<F, T>(ctx: RequestContext, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT.scope(ctx, fut).await
}

/// Read the ambient context. `Err` means this code ran outside a request
/// scope — a fatal misconfiguration, never papered over with a default.
pub fn current() -> Result<RequestContext, crate::error::Error> {
    CURRENT
        .try_with(|ctx| ctx.clone())
        .map_err(|_| crate::error::Error::Other("no active request context".into()))
}

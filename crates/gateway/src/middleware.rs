//! The header-scoped half of the request-plane pipeline (spec.md §2):
//! authenticate -> extract tenant -> rate limit. RBAC and the audit trail
//! need the tool name, which only exists inside the JSON-RPC body, so those
//! two stages run inside the tool-invocation handler instead of as layers
//! here — see `handlers::invoke_tool`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rag_domain::context;
use uuid::Uuid;

use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-api-key").and_then(|v| v.to_str().ok())
}

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let outcome = state
        .authenticator
        .authenticate(bearer_token(req.headers()), api_key(req.headers()))
        .await;

    match outcome {
        Ok(outcome) => {
            req.extensions_mut().insert(outcome);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn extract_tenant(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth) = req.extensions().get::<rag_auth::AuthOutcome>().cloned() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "authenticate must run before extract_tenant")
            .into_response();
    };

    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4);

    match state.tenant_extractor.extract(request_id, &auth).await {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx.clone());
            context::scope(ctx, next.run(req)).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn rate_limit(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let Ok(ctx) = context::current() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "extract_tenant must run before rate_limit")
            .into_response();
    };

    let decision = state.rate_limiter.check(ctx.tenant_id).await;
    if !decision.allowed {
        let err = rag_domain::error::Error::RateLimitExceeded {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_time: decision.reset_time,
            retry_after: decision.retry_after,
        };
        return err.into_response();
    }

    next.run(req).await
}

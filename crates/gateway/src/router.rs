use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware as mw;
use crate::state::AppState;

/// Builds the full router. `/v1/health` is unauthenticated (used by load
/// balancer probes); everything else runs the full auth -> tenant ->
/// rate-limit chain before reaching a handler.
pub fn build(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    let protected = Router::new()
        .route("/v1/tools/invoke", post(handlers::invoke_tool))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), mw::rate_limit))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), mw::extract_tenant))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), mw::authenticate));

    Router::new()
        .route("/v1/health", get(handlers::health))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Ported from the teacher gateway's `build_cors_layer`: exact origins plus
/// a `host:*` wildcard-port predicate, with a permissive fast path when the
/// config is the single-entry `["*"]` wildcard.
fn build_cors_layer(cors: &rag_domain::config::CorsConfig) -> CorsLayer {
    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

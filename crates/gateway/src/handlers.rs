//! The one inbound transport this workspace ships: a JSON-RPC-shaped
//! tool-invocation endpoint. RBAC and the audit trail run here, once the
//! tool name is known, closing out the pipeline the header-scoped
//! middleware in `middleware.rs` started.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rag_audit::{infer_resource_type, AuditEvent};
use rag_domain::context;
use rag_domain::error::Error;
use rag_domain::role::Role;
use rag_memory::{AddMemoryRequest, SearchRequest, UpdateMemoryRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToolInvocation {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub result: Value,
}

pub async fn invoke_tool(State(state): State<AppState>, Json(req): Json<ToolInvocation>) -> Response {
    match run(&state, &req).await {
        Ok(result) => Json(ToolResult { result }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn run(state: &AppState, req: &ToolInvocation) -> Result<Value, Error> {
    let ctx = context::current()?;

    state.authorizer.authorize(ctx.tenant_id, ctx.role, &req.tool)?;

    let claimed_tenant = param_uuid(&req.params, "tenant_id").unwrap_or(Ok(ctx.tenant_id))?;
    let effective_tenant = if claimed_tenant == ctx.tenant_id || ctx.role == Role::UberAdmin {
        claimed_tenant
    } else {
        return Err(Error::TenantIsolation {
            message: "params.tenant_id does not match the authenticated tenant".into(),
            details: serde_json::json!({ "claimed": claimed_tenant, "actual": ctx.tenant_id }),
        });
    };

    let pre_audit = AuditEvent::new(req.tool.clone(), infer_resource_type(&req.tool), false)
        .tenant(effective_tenant)
        .user(ctx.user_id)
        .role(ctx.role);
    state.audit.record(pre_audit);

    let outcome = dispatch(state, &req.tool, &req.params, effective_tenant).await;

    let post_audit = AuditEvent::new(req.tool.clone(), infer_resource_type(&req.tool), outcome.is_ok())
        .tenant(effective_tenant)
        .user(ctx.user_id)
        .role(ctx.role);
    state.audit.record(post_audit);

    outcome
}

async fn dispatch(state: &AppState, tool: &str, params: &Value, tenant_id: Uuid) -> Result<Value, Error> {
    let ctx = context::current()?;

    match tool {
        "mem0_search_memory" => {
            let target_user = param_uuid(params, "user_id").unwrap_or(Ok(ctx.user_id))?;
            state.memory.check_access(ctx.role, ctx.user_id, target_user)?;
            let resp = state
                .memory
                .search(SearchRequest {
                    tenant_id,
                    user_id: target_user,
                    query: param_str(params, "search_query").unwrap_or_default(),
                    limit: param_u32(params, "limit").unwrap_or(10),
                    session_id: param_str_opt(params, "session_id"),
                    memory_key: param_str_opt(params, "memory_key"),
                    created_after: param_datetime(params, "created_after")?,
                    created_before: param_datetime(params, "created_before")?,
                })
                .await?;
            Ok(serde_json::to_value(resp)?)
        }
        "mem0_get_user_memory" => {
            let target_user = param_uuid(params, "user_id").ok_or_else(|| missing("user_id"))??;
            state.memory.check_access(ctx.role, ctx.user_id, target_user)?;
            let resp = state
                .memory
                .search(SearchRequest {
                    tenant_id,
                    user_id: target_user,
                    query: String::new(),
                    limit: param_u32(params, "limit").unwrap_or(50),
                    session_id: None,
                    memory_key: None,
                    created_after: None,
                    created_before: None,
                })
                .await?;
            Ok(serde_json::to_value(resp)?)
        }
        "mem0_add_memory" => {
            let target_user = param_uuid(params, "user_id").unwrap_or(Ok(ctx.user_id))?;
            state.memory.check_access(ctx.role, ctx.user_id, target_user)?;
            let outcome = state
                .memory
                .add(AddMemoryRequest {
                    tenant_id,
                    user_id: target_user,
                    content: param_str(params, "memory_value")
                        .or_else(|| param_str(params, "content"))
                        .ok_or_else(|| missing("memory_value"))?,
                    tags: param_str_vec(params, "tags"),
                    metadata: params.get("metadata").cloned().unwrap_or(Value::Null),
                })
                .await?;
            Ok(serde_json::to_value(outcome)?)
        }
        "mem0_update_memory" => {
            let target_user = param_uuid(params, "user_id").unwrap_or(Ok(ctx.user_id))?;
            state.memory.check_access(ctx.role, ctx.user_id, target_user)?;
            match state
                .memory
                .update(UpdateMemoryRequest {
                    tenant_id,
                    user_id: target_user,
                    memory_id: param_str(params, "memory_key")
                        .or_else(|| param_str(params, "memory_id"))
                        .ok_or_else(|| missing("memory_key"))?,
                    content: param_str(params, "memory_value")
                        .or_else(|| param_str(params, "content"))
                        .ok_or_else(|| missing("memory_value"))?,
                })
                .await
            {
                Ok(record) => Ok(serde_json::json!({ "record": record, "source": "primary" })),
                Err(e) => {
                    // The primary update failed; per S4 the coordinator's
                    // write-queue fallback only covers `add`, so an update
                    // against a down primary is re-issued as a queued add.
                    let outcome = state
                        .memory
                        .add(AddMemoryRequest {
                            tenant_id,
                            user_id: target_user,
                            content: param_str(params, "memory_value")
                                .or_else(|| param_str(params, "content"))
                                .ok_or_else(|| missing("memory_value"))?,
                            tags: Vec::new(),
                            metadata: serde_json::json!({ "update_of": param_str(params, "memory_key") }),
                        })
                        .await;
                    match outcome {
                        Ok(outcome) => Ok(serde_json::json!({
                            "record": outcome.record,
                            "source": outcome.source,
                            "created": true,
                        })),
                        Err(_) => Err(e),
                    }
                }
            }
        }
        "rag_interrupt_session" => {
            let session_id = param_str(params, "session_id").ok_or_else(|| missing("session_id"))?;
            let current_query = param_str(params, "current_query").unwrap_or_default();
            let envelope = state
                .sessions
                .interrupt_session(tenant_id, ctx.user_id, &session_id, &current_query)
                .await?;
            Ok(serde_json::to_value(envelope)?)
        }
        "rag_resume_session" => {
            let session_id = param_str(params, "session_id").ok_or_else(|| missing("session_id"))?;
            let outcome = state
                .sessions
                .resume_session(tenant_id, ctx.user_id, &session_id)
                .await?;
            Ok(serde_json::to_value(outcome)?)
        }
        "tenant_configuration" => Ok(serde_json::json!({
            "tenant_id": tenant_id,
            "rate_limit": {
                "enabled": state.config.rate_limit.enabled,
                "requests_per_window": state.config.rate_limit.requests_per_window,
                "window_seconds": state.config.rate_limit.window_seconds,
            },
            "sessions": { "ttl_secs": state.config.sessions.ttl_secs },
        })),
        "data_export" => {
            let resp = state
                .memory
                .search(SearchRequest {
                    tenant_id,
                    user_id: ctx.user_id,
                    query: String::new(),
                    limit: 1000,
                    session_id: None,
                    memory_key: None,
                    created_after: None,
                    created_before: None,
                })
                .await?;
            Ok(serde_json::json!({ "tenant_id": tenant_id, "memories": resp.results }))
        }
        other => Err(Error::Validation {
            message: format!("unknown tool \"{other}\""),
            details: Value::Null,
        }),
    }
}

fn missing(field: &str) -> Error {
    Error::Validation {
        message: format!("params.{field} is required"),
        details: Value::Null,
    }
}

fn param_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn param_str_opt(params: &Value, key: &str) -> Option<String> {
    param_str(params, key)
}

fn param_str_vec(params: &Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn param_u32(params: &Value, key: &str) -> Option<u32> {
    params.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
}

fn param_uuid(params: &Value, key: &str) -> Option<Result<Uuid, Error>> {
    params.get(key).and_then(|v| v.as_str()).map(|s| {
        Uuid::parse_str(s).map_err(|_| Error::Validation {
            message: format!("params.{key} is not a valid uuid"),
            details: Value::Null,
        })
    })
}

fn param_datetime(params: &Value, key: &str) -> Result<Option<DateTime<Utc>>, Error> {
    match params.get(key).and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| Error::Validation {
                message: format!("params.{key} is not a valid RFC3339 timestamp"),
                details: Value::Null,
            }),
    }
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

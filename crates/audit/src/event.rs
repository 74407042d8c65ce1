use chrono::{DateTime, Utc};
use rag_domain::role::Role;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// One entry in the append-only audit trail. Distinct from the diagnostic
/// `TraceEvent` stream in `rag-domain::trace` — this is the record a
/// compliance query reads, not something an operator greps.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub role: Option<Role>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Value,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>, success: bool) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            tenant_id: None,
            user_id: None,
            role: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            details: Value::Null,
            success,
            timestamp: Utc::now(),
        }
    }

    pub fn tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Infer a tool's resource type from its name prefix, for tools invoked
/// through the generic dispatch path that does not already know it from
/// the registry entry.
pub fn infer_resource_type(tool_name: &str) -> &'static str {
    if tool_name.starts_with("mem0_") {
        "memory"
    } else if tool_name.starts_with("rag_") && tool_name.contains("session") {
        "session"
    } else if tool_name.starts_with("tenant_") {
        "tenant"
    } else {
        "unknown"
    }
}

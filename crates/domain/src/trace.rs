use serde::Serialize;

/// Structured diagnostic events, distinct from the audit trail in
/// `rag-audit`. These are for operators grepping logs, not for compliance
/// queries — no tenant isolation guarantees apply to this stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    JwksRefreshed {
        issuer: String,
        key_count: usize,
        duration_ms: u64,
    },
    AuthSucceeded {
        tenant_id: String,
        user_id: String,
        method: String,
        duration_ms: u64,
    },
    AuthFailed {
        method: String,
        reason: String,
    },
    TenantValidated {
        tenant_id: String,
    },
    RbacDenied {
        tenant_id: String,
        role: String,
        tool_name: String,
    },
    RateLimited {
        tenant_id: String,
        limit: u64,
        retry_after: u64,
    },
    RateLimitStoreUnavailable {
        tenant_id: String,
        reason: String,
    },
    PrimaryMemoryDegraded {
        tenant_id: String,
        reason: String,
    },
    PrimaryMemoryRecovered {
        tenant_id: String,
    },
    WriteQueueDrained {
        tenant_id: String,
        entries: usize,
    },
    SessionResolved {
        session_id: String,
        is_new: bool,
    },
    SessionInterrupted {
        session_id: String,
    },
    SessionResumed {
        session_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "rag_event");
    }
}

use rag_domain::error::Error;
use uuid::Uuid;

const PREFIX: &str = "tenant";

fn tenant_key(tenant_id: Uuid, segments: &[&str]) -> String {
    let mut key = format!("{PREFIX}:{tenant_id}");
    for seg in segments {
        key.push(':');
        key.push_str(seg);
    }
    key
}

/// `tenant:{tid}:cache:{resource_type}:{resource_id}`
pub fn cache_key(tenant_id: Uuid, resource_type: &str, resource_id: &str) -> String {
    tenant_key(tenant_id, &["cache", resource_type, resource_id])
}

/// `tenant:{tid}:user:{uid}:session:{session_id}`
pub fn session_key(tenant_id: Uuid, user_id: Uuid, session_id: &str) -> String {
    let user_id = user_id.to_string();
    tenant_key(tenant_id, &["user", &user_id, "session", session_id])
}

/// `tenant:{tid}:rate_limit:{identifier}` — the request plane rate-limits
/// per tenant, not per user or per route, so `identifier` is always the
/// literal `"tenant"`; the parameter is still named to match the table in
/// the key contract rather than hard-coding the string twice.
pub fn rate_limit_key(tenant_id: Uuid) -> String {
    tenant_key(tenant_id, &["rate_limit", "tenant"])
}

/// `tenant:{tid}:user:{uid}:memory:{memory_id}` — one fallback record.
pub fn user_memory_key(tenant_id: Uuid, user_id: Uuid, memory_id: &str) -> String {
    let user_id = user_id.to_string();
    tenant_key(tenant_id, &["user", &user_id, "memory", memory_id])
}

/// `tenant:{tid}:user:{uid}:memory:*` — the scan pattern the fallback
/// search path iterates when the primary memory service is degraded.
pub fn user_memory_scan_pattern(tenant_id: Uuid, user_id: Uuid) -> String {
    let user_id = user_id.to_string();
    tenant_key(tenant_id, &["user", &user_id, "memory", "*"])
}

/// `tenant:{tid}:mem0_write_queue` — queued primary-memory writes awaiting
/// drain. Not nested under `user:{uid}` like the other keys: the queue is
/// tenant-wide, drained once per tenant and replaying entries for every
/// user in arrival order.
pub fn write_queue_key(tenant_id: Uuid) -> String {
    tenant_key(tenant_id, &["mem0_write_queue"])
}

/// `tenant:{tid}:user:{uid}:user_recognition:memory:{uid}` — cached
/// greeting/context-summary snapshot for the user-recognition read path.
pub fn user_recognition_key(tenant_id: Uuid, user_id: Uuid) -> String {
    let user_id = user_id.to_string();
    tenant_key(
        tenant_id,
        &["user", &user_id, "user_recognition", "memory", &user_id],
    )
}

/// `tenant:{tid}:user:*` — scan pattern covering every per-user key under a
/// tenant (sessions, per-user memory, user-recognition cache). Callers that
/// only want one of those families filter the returned keys themselves,
/// since `KvStore::scan` only understands a single trailing wildcard.
pub fn tenant_user_scan_pattern(tenant_id: Uuid) -> String {
    tenant_key(tenant_id, &["user", "*"])
}

/// `tenant-{tid}` — the object-storage bucket name for one tenant.
pub fn object_storage_bucket(tenant_id: Uuid) -> String {
    format!("tenant-{tenant_id}")
}

/// `tenant_{tid}` — the vector index name for one tenant (underscore, not
/// hyphen: most vector engines reject hyphens in index names).
pub fn vector_index_name(tenant_id: Uuid) -> String {
    format!("tenant_{tenant_id}")
}

/// `tenant-{tid}` — the text index name for one tenant.
pub fn text_index_name(tenant_id: Uuid) -> String {
    format!("tenant-{tenant_id}")
}

/// Every key this crate produces is prefixed `tenant:{tid}:...`. This
/// rejects any key that does not carry the *current* tenant's prefix,
/// closing off the cross-tenant key-guessing path the isolation invariant
/// exists to prevent.
pub fn validate_tenant_prefix(key: &str, tenant_id: Uuid) -> Result<(), Error> {
    let expected = format!("{PREFIX}:{tenant_id}:");
    if key.starts_with(&expected) {
        Ok(())
    } else {
        Err(Error::TenantIsolation {
            message: format!("key \"{key}\" does not carry tenant {tenant_id}'s prefix"),
            details: serde_json::json!({ "key": key, "tenant_id": tenant_id.to_string() }),
        })
    }
}

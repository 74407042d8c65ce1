use rag_domain::error::Error;
use rag_domain::registry::lookup;
use rag_domain::role::Role;
use rag_domain::trace::TraceEvent;
use uuid::Uuid;

/// Authorizes a (role, tool_name) pair against the static tool registry.
///
/// `UberAdmin` bypasses the matrix entirely — it is the one role the
/// registry does not need to enumerate permissions for. Every other role
/// is checked against the tool's `allowed_roles` list; in `strict_mode`
/// (the default, and the only mode this workspace wires up) a tool name
/// absent from the registry is denied, never implicitly allowed.
pub struct Authorizer {
    strict_mode: bool,
}

impl Authorizer {
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    pub fn authorize(&self, tenant_id: Uuid, role: Role, tool_name: &str) -> Result<(), Error> {
        if role == Role::UberAdmin {
            return Ok(());
        }

        let Some(tool) = lookup(tool_name) else {
            if self.strict_mode {
                TraceEvent::RbacDenied {
                    tenant_id: tenant_id.to_string(),
                    role: role.to_string(),
                    tool_name: tool_name.to_string(),
                }
                .emit();
                return Err(Error::Authorization {
                    message: format!("tool \"{tool_name}\" is not in the registry"),
                    details: serde_json::json!({ "tool_name": tool_name }),
                });
            }
            return Ok(());
        };

        if tool.allowed_roles.contains(&role) {
            Ok(())
        } else {
            TraceEvent::RbacDenied {
                tenant_id: tenant_id.to_string(),
                role: role.to_string(),
                tool_name: tool_name.to_string(),
            }
            .emit();
            Err(Error::Authorization {
                message: format!("role \"{role}\" may not call tool \"{tool_name}\""),
                details: serde_json::json!({ "tool_name": tool_name, "role": role.to_string() }),
            })
        }
    }
}

use crate::role::Role;

/// An explicit tool-catalog entry. Populated into a `const` table at
/// startup rather than discovered via decorators or reflection, so the
/// authorizer's policy matrix is a compile-time-checkable, greppable list.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub resource_type: &'static str,
    pub allowed_roles: &'static [Role],
}

/// The tool catalog this deployment exposes. Names follow the upstream
/// memory/session-continuity naming convention so the end-to-end scenarios
/// in the test suite can reference them literally.
pub static TOOL_REGISTRY: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "mem0_search_memory",
        resource_type: "memory",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "mem0_add_memory",
        resource_type: "memory",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "mem0_update_memory",
        resource_type: "memory",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "mem0_get_user_memory",
        resource_type: "memory",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "rag_interrupt_session",
        resource_type: "session",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "rag_resume_session",
        resource_type: "session",
        allowed_roles: &[Role::TenantAdmin, Role::ProjectAdmin, Role::EndUser],
    },
    ToolDescriptor {
        name: "tenant_configuration",
        resource_type: "tenant",
        allowed_roles: &[Role::TenantAdmin],
    },
    ToolDescriptor {
        name: "data_export",
        resource_type: "tenant",
        allowed_roles: &[Role::TenantAdmin],
    },
];

/// Look up a tool by name. `None` means the name is unmapped — the
/// authorizer's default is deny, not implicit allow.
pub fn lookup(tool_name: &str) -> Option<&'static ToolDescriptor> {
    TOOL_REGISTRY.iter().find(|t| t.name == tool_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registry_entry_has_at_least_one_allowed_role() {
        for tool in TOOL_REGISTRY {
            assert!(!tool.allowed_roles.is_empty(), "{} has no allowed roles", tool.name);
        }
    }

    #[test]
    fn unmapped_tool_name_is_not_found() {
        assert!(lookup("does_not_exist").is_none());
    }
}

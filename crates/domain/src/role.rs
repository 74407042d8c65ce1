use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles are flat and non-inheriting: `UberAdmin` is granted explicit
/// bypass privileges in the authorizer and rate limiter, it does not
/// "contain" the other roles' permission sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    UberAdmin,
    TenantAdmin,
    ProjectAdmin,
    EndUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::UberAdmin => "uber_admin",
            Role::TenantAdmin => "tenant_admin",
            Role::ProjectAdmin => "project_admin",
            Role::EndUser => "end_user",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "uber_admin" => Some(Role::UberAdmin),
            "tenant_admin" => Some(Role::TenantAdmin),
            "project_admin" => Some(Role::ProjectAdmin),
            "end_user" => Some(Role::EndUser),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a request was authenticated. Carried in the request context so
/// downstream components (audit, rate limiter) can record it without
/// re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    OAuth,
    ApiKey,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::OAuth => write!(f, "oauth"),
            AuthMethod::ApiKey => write!(f, "api_key"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrips_through_str() {
        for role in [
            Role::UberAdmin,
            Role::TenantAdmin,
            Role::ProjectAdmin,
            Role::EndUser,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_string_parses_to_none() {
        assert_eq!(Role::parse("superuser"), None);
    }
}

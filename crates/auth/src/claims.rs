use rag_domain::error::Error;
use rag_domain::role::Role;
use serde_json::Value;
use uuid::Uuid;

/// Identity extracted from a verified JWT, resolved against configurable
/// claim names since identity providers disagree on where tenant/role live.
#[derive(Debug, Clone)]
pub struct ExtractedClaims {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

pub struct ClaimNames<'a> {
    pub user_id: &'a str,
    pub tenant_id: &'a str,
    pub role: &'a str,
}

/// Pull `{user_id, tenant_id, role}` out of a decoded token body using the
/// configured claim names. Returns a specific `Validation` error per
/// missing/malformed claim so the caller's audit log records which one.
pub fn extract(claims: &Value, names: &ClaimNames<'_>) -> Result<ExtractedClaims, Error> {
    let user_id = claim_str(claims, names.user_id)?;
    let tenant_id = claim_str(claims, names.tenant_id)?;
    let role_str = claim_str(claims, names.role)?;

    let user_id = Uuid::parse_str(&user_id).map_err(|_| Error::Validation {
        message: format!("claim \"{}\" is not a valid UUID", names.user_id),
        details: serde_json::json!({ "claim": names.user_id }),
    })?;
    let tenant_id = Uuid::parse_str(&tenant_id).map_err(|_| Error::Validation {
        message: format!("claim \"{}\" is not a valid UUID", names.tenant_id),
        details: serde_json::json!({ "claim": names.tenant_id }),
    })?;
    let role = Role::parse(&role_str).ok_or_else(|| Error::Validation {
        message: format!("claim \"{}\" is not a recognized role: \"{role_str}\"", names.role),
        details: serde_json::json!({ "claim": names.role, "value": role_str }),
    })?;

    Ok(ExtractedClaims {
        user_id,
        tenant_id,
        role,
    })
}

fn claim_str(claims: &Value, name: &str) -> Result<String, Error> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Authentication {
            message: format!("token is missing required claim \"{name}\""),
            details: serde_json::json!({ "claim": name }),
            recovery_suggestions: vec!["check that the identity provider issues this claim".into()],
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> ClaimNames<'static> {
        ClaimNames {
            user_id: "sub",
            tenant_id: "tenant_id",
            role: "role",
        }
    }

    #[test]
    fn extracts_all_three_fields_from_well_formed_claims() {
        let uid = Uuid::new_v4();
        let tid = Uuid::new_v4();
        let claims = serde_json::json!({
            "sub": uid.to_string(),
            "tenant_id": tid.to_string(),
            "role": "end_user",
        });
        let extracted = extract(&claims, &names()).unwrap();
        assert_eq!(extracted.user_id, uid);
        assert_eq!(extracted.tenant_id, tid);
        assert_eq!(extracted.role, Role::EndUser);
    }

    #[test]
    fn missing_claim_is_an_authentication_error() {
        let claims = serde_json::json!({ "sub": Uuid::new_v4().to_string() });
        let err = extract(&claims, &names()).unwrap_err();
        assert_eq!(err.code(), "AUTH-001");
    }

    #[test]
    fn non_uuid_claim_is_a_validation_error() {
        let claims = serde_json::json!({
            "sub": "not-a-uuid",
            "tenant_id": Uuid::new_v4().to_string(),
            "role": "end_user",
        });
        let err = extract(&claims, &names()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION-001");
    }

    #[test]
    fn unrecognized_role_string_is_a_validation_error() {
        let claims = serde_json::json!({
            "sub": Uuid::new_v4().to_string(),
            "tenant_id": Uuid::new_v4().to_string(),
            "role": "superuser",
        });
        let err = extract(&claims, &names()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION-001");
    }
}

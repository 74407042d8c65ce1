use serde::{Deserialize, Serialize};

/// OAuth/OIDC verification settings for the bearer-token authentication path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Issuer URL, checked against the token's `iss` claim.
    #[serde(default)]
    pub issuer: String,
    /// Expected audience value(s); empty means "do not check".
    #[serde(default)]
    pub audience: Vec<String>,
    /// JWKS endpoint used to resolve signing keys by `kid`.
    #[serde(default)]
    pub jwks_url: String,
    /// Userinfo endpoint, used as a fallback when the token itself is
    /// missing the configured tenant/user claims.
    #[serde(default)]
    pub userinfo_url: Option<String>,
    /// How long a fetched JWKS document is trusted before a refetch.
    #[serde(default = "d_jwks_ttl")]
    pub jwks_cache_ttl_secs: u64,
    /// Claim name carrying the user id. Configurable because identity
    /// providers disagree on `sub` vs custom claims.
    #[serde(default = "d_claim_user")]
    pub user_id_claim: String,
    #[serde(default = "d_claim_tenant")]
    pub tenant_id_claim: String,
    #[serde(default = "d_claim_role")]
    pub role_claim: String,
    /// Emit a warning diagnostic when verification exceeds this budget.
    #[serde(default = "d_timeout_budget_ms")]
    pub auth_timeout_budget_ms: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            issuer: String::new(),
            audience: Vec::new(),
            jwks_url: String::new(),
            userinfo_url: None,
            jwks_cache_ttl_secs: d_jwks_ttl(),
            user_id_claim: d_claim_user(),
            tenant_id_claim: d_claim_tenant(),
            role_claim: d_claim_role(),
            auth_timeout_budget_ms: d_timeout_budget_ms(),
        }
    }
}

fn d_jwks_ttl() -> u64 {
    300
}
fn d_claim_user() -> String {
    "sub".into()
}
fn d_claim_tenant() -> String {
    "tenant_id".into()
}
fn d_claim_role() -> String {
    "role".into()
}
fn d_timeout_budget_ms() -> u64 {
    50
}

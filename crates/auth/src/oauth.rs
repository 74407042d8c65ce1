use crate::claims::{self, ClaimNames, ExtractedClaims};
use crate::jwks::{JwksCache, JwksFetcher};
use jsonwebtoken::{decode, decode_header, Validation};
use rag_domain::error::Error;
use serde_json::Value;
use std::time::Duration;

pub struct OAuthVerifierConfig {
    pub issuer: String,
    pub audience: Vec<String>,
    pub jwks_url: String,
    pub jwks_cache_ttl: Duration,
    pub userinfo_url: Option<String>,
    pub user_id_claim: String,
    pub tenant_id_claim: String,
    pub role_claim: String,
}

/// Verifies OAuth bearer tokens: resolves the signing key by `kid` from a
/// cached JWKS, checks signature/issuer/audience/expiry, then extracts the
/// tenant/user/role claims — falling back to the userinfo endpoint when the
/// token itself does not carry them.
pub struct OAuthVerifier {
    jwks: JwksCache,
    issuer: String,
    audience: Vec<String>,
    userinfo_url: Option<String>,
    claim_names: (String, String, String),
    http: reqwest::Client,
}

impl OAuthVerifier {
    pub fn new(config: OAuthVerifierConfig) -> Self {
        Self {
            jwks: JwksCache::new(JwksFetcher::new(config.jwks_url), config.jwks_cache_ttl),
            issuer: config.issuer,
            audience: config.audience,
            userinfo_url: config.userinfo_url,
            claim_names: (config.user_id_claim, config.tenant_id_claim, config.role_claim),
            http: reqwest::Client::new(),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<ExtractedClaims, Error> {
        let header = decode_header(token).map_err(|e| Error::Authentication {
            message: format!("malformed token header: {e}"),
            details: Value::Null,
            recovery_suggestions: vec![],
        })?;
        let kid = header.kid.ok_or_else(|| Error::Authentication {
            message: "token header is missing \"kid\"".into(),
            details: Value::Null,
            recovery_suggestions: vec![],
        })?;

        let (key, alg) = self.jwks.resolve(&kid).await?;

        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.issuer]);
        if !self.audience.is_empty() {
            validation.set_audience(&self.audience);
        } else {
            validation.validate_aud = false;
        }

        let decoded = decode::<Value>(token, &key, &validation).map_err(|e| Error::Authentication {
            message: format!("token verification failed: {e}"),
            details: Value::Null,
            recovery_suggestions: vec!["re-authenticate and retry".into()],
        })?;

        let names = ClaimNames {
            user_id: &self.claim_names.0,
            tenant_id: &self.claim_names.1,
            role: &self.claim_names.2,
        };

        match claims::extract(&decoded.claims, &names) {
            Ok(extracted) => Ok(extracted),
            Err(_) if self.userinfo_url.is_some() => self.fetch_from_userinfo(token, &names).await,
            Err(e) => Err(e),
        }
    }

    async fn fetch_from_userinfo(
        &self,
        token: &str,
        names: &ClaimNames<'_>,
    ) -> Result<ExtractedClaims, Error> {
        let url = self.userinfo_url.as_ref().unwrap();
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable {
                message: format!("userinfo fetch failed: {e}"),
                details: Value::Null,
            })?;
        let body: Value = resp.json().await.map_err(|e| Error::ServiceUnavailable {
            message: format!("userinfo response was not valid JSON: {e}"),
            details: Value::Null,
        })?;
        claims::extract(&body, names)
    }
}

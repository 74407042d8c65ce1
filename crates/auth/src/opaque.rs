use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rag_domain::error::Error;
use rag_domain::role::Role;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// A stored API key record, as the external relational store would return
/// it. This workspace only consumes the shape; persistence is out of scope.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub tenant_id: Uuid,
    /// SHA-256 pre-digest of the full key, stored so the secondary hash's
    /// input length is bounded and a key can be located without an O(n)
    /// Argon2 verification against every row up front.
    pub key_digest: [u8; 32],
    /// Argon2 PHC string of the same key, checked only after the digest
    /// pre-filter narrows the candidate to (at most) one record.
    pub key_hash: String,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
}

/// External contract for looking up API key records and resolving the
/// principal associated with one. Out of scope per this workspace's remit
/// (the relational store lives elsewhere); a real deployment implements
/// this against its user/API-key tables.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Active (non-revoked) keys, most-recently-created first, so a scan
    /// capped below the full count still favors the keys most likely to
    /// be presented.
    async fn active_keys(&self) -> Result<Vec<ApiKeyRecord>, Error>;
    /// The principal an API key authenticates as. The original system
    /// resolves "the first user of the tenant"; this workspace keeps that
    /// contract rather than inventing a per-key user mapping the data
    /// model doesn't have.
    async fn first_user_of_tenant(&self, tenant_id: Uuid) -> Result<Option<Uuid>, Error>;
}

pub struct OpaqueKeyVerifier {
    scan_cap: usize,
}

impl OpaqueKeyVerifier {
    pub fn new(scan_cap: usize) -> Self {
        Self { scan_cap }
    }

    pub async fn verify(
        &self,
        presented_key: &str,
        repo: &dyn ApiKeyRepository,
    ) -> Result<(Uuid, Uuid, Role), Error> {
        let digest: [u8; 32] = Sha256::digest(presented_key.as_bytes()).into();

        let keys = repo.active_keys().await?;
        if keys.len() > self.scan_cap {
            tracing::warn!(
                active_key_count = keys.len(),
                scan_cap = self.scan_cap,
                "active API key count exceeds scan cap; only scanning the first {} keys",
                self.scan_cap
            );
        }

        let argon2 = Argon2::default();
        for record in keys.iter().take(self.scan_cap) {
            if record.key_digest.ct_eq(&digest).unwrap_u8() != 1 {
                continue;
            }
            let parsed = PasswordHash::new(&record.key_hash).map_err(|e| Error::Authentication {
                message: format!("stored key hash is malformed: {e}"),
                details: serde_json::Value::Null,
                recovery_suggestions: vec![],
            })?;
            if argon2
                .verify_password(presented_key.as_bytes(), &parsed)
                .is_err()
            {
                continue;
            }
            if let Some(expires_at) = record.expires_at {
                if expires_at < Utc::now() {
                    return Err(Error::Authentication {
                        message: "API key has expired".into(),
                        details: serde_json::Value::Null,
                        recovery_suggestions: vec!["issue a new API key".into()],
                    });
                }
            }
            let user_id = repo
                .first_user_of_tenant(record.tenant_id)
                .await?
                .ok_or_else(|| Error::Authentication {
                    message: "API key's tenant has no resolvable user".into(),
                    details: serde_json::json!({ "tenant_id": record.tenant_id.to_string() }),
                    recovery_suggestions: vec![],
                })?;
            return Ok((record.tenant_id, user_id, record.role));
        }

        Err(Error::Authentication {
            message: "no active API key matched".into(),
            details: serde_json::Value::Null,
            recovery_suggestions: vec!["check the key has not been revoked".into()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString};

    struct FixedRepo {
        keys: Vec<ApiKeyRecord>,
        user_by_tenant: Uuid,
    }

    #[async_trait]
    impl ApiKeyRepository for FixedRepo {
        async fn active_keys(&self) -> Result<Vec<ApiKeyRecord>, Error> {
            Ok(self.keys.clone())
        }
        async fn first_user_of_tenant(&self, _tenant_id: Uuid) -> Result<Option<Uuid>, Error> {
            Ok(Some(self.user_by_tenant))
        }
    }

    fn hash(key: &str) -> String {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        Argon2::default()
            .hash_password(key.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn record(tenant_id: Uuid, key: &str, role: Role, expires_at: Option<DateTime<Utc>>) -> ApiKeyRecord {
        ApiKeyRecord {
            tenant_id,
            key_digest: Sha256::digest(key.as_bytes()).into(),
            key_hash: hash(key),
            role,
            expires_at,
        }
    }

    #[tokio::test]
    async fn valid_key_resolves_tenant_user_and_role() {
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let repo = FixedRepo {
            keys: vec![record(tenant_id, "sk-valid", Role::ProjectAdmin, None)],
            user_by_tenant: user_id,
        };
        let verifier = OpaqueKeyVerifier::new(100);
        let (tid, uid, role) = verifier.verify("sk-valid", &repo).await.unwrap();
        assert_eq!(tid, tenant_id);
        assert_eq!(uid, user_id);
        assert_eq!(role, Role::ProjectAdmin);
    }

    #[tokio::test]
    async fn unknown_key_is_rejected() {
        let repo = FixedRepo {
            keys: vec![record(Uuid::new_v4(), "sk-real", Role::EndUser, None)],
            user_by_tenant: Uuid::new_v4(),
        };
        let verifier = OpaqueKeyVerifier::new(100);
        assert!(verifier.verify("sk-wrong", &repo).await.is_err());
    }

    #[tokio::test]
    async fn expired_key_is_rejected() {
        let tenant_id = Uuid::new_v4();
        let repo = FixedRepo {
            keys: vec![record(
                tenant_id,
                "sk-expired",
                Role::EndUser,
                Some(Utc::now() - chrono::Duration::hours(1)),
            )],
            user_by_tenant: Uuid::new_v4(),
        };
        let verifier = OpaqueKeyVerifier::new(100);
        assert!(verifier.verify("sk-expired", &repo).await.is_err());
    }

    #[tokio::test]
    async fn scan_cap_limits_how_many_records_are_checked() {
        let tenant_id = Uuid::new_v4();
        // the matching key is placed beyond the cap, so it is never reached.
        let mut keys: Vec<ApiKeyRecord> = (0..5)
            .map(|i| record(Uuid::new_v4(), &format!("sk-filler-{i}"), Role::EndUser, None))
            .collect();
        keys.push(record(tenant_id, "sk-needle", Role::EndUser, None));
        let repo = FixedRepo {
            keys,
            user_by_tenant: Uuid::new_v4(),
        };
        let verifier = OpaqueKeyVerifier::new(5);
        assert!(verifier.verify("sk-needle", &repo).await.is_err());
    }
}

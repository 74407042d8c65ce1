//! In-memory stand-ins for the relational store this workspace treats as
//! external (spec.md §1 Non-goals: "a custom identity provider"). A real
//! deployment implements `UserRepository` and `ApiKeyRepository` against
//! its own user/API-key tables; these exist so the gateway is runnable and
//! testable without one.

use async_trait::async_trait;
use parking_lot::RwLock;
use rag_auth::{ApiKeyRecord, ApiKeyRepository};
use rag_domain::error::Error;
use rag_tenant::{UserRecord, UserRepository};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: Uuid, tenant_id: Uuid) {
        self.users.write().push(UserRecord { user_id, tenant_id });
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, Error> {
        Ok(self.users.read().iter().find(|u| u.user_id == user_id).copied())
    }
}

#[derive(Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<Vec<ApiKeyRecord>>,
    first_user_by_tenant: RwLock<std::collections::HashMap<Uuid, Uuid>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ApiKeyRecord, first_user: Uuid) {
        self.first_user_by_tenant.write().insert(record.tenant_id, first_user);
        self.keys.write().push(record);
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn active_keys(&self) -> Result<Vec<ApiKeyRecord>, Error> {
        Ok(self.keys.read().clone())
    }

    async fn first_user_of_tenant(&self, tenant_id: Uuid) -> Result<Option<Uuid>, Error> {
        Ok(self.first_user_by_tenant.read().get(&tenant_id).copied())
    }
}

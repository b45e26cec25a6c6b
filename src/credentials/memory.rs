//! In-process credential store, used for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CredentialError, CredentialStore, UserRecord, normalize_email};

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user, keyed by id. The email is normalized.
    pub async fn insert(&self, user_id: &str, email: &str, password_hash: &str) {
        let record = UserRecord {
            id: user_id.to_string(),
            email: normalize_email(email),
            password_hash: password_hash.to_string(),
        };
        self.users.write().await.insert(record.id.clone(), record);
    }

    pub async fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, CredentialError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn update_password(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(user_id).is_some_and(|user| {
            user.password_hash = password_hash.to_string();
            true
        }))
    }

    async fn ping(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}

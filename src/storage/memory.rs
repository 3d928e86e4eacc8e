//! In-memory credential store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::user::CredentialRecord;
use crate::error::{Result, RustyUsersError};
use crate::storage::traits::{CredentialStore, SharedCredentialStore};

/// Credential store backed by a map keyed on normalized email
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Emails compare case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let users = self.users.read().await;
        Ok(users.get(&normalize_email(email)).cloned())
    }

    async fn insert(&self, record: CredentialRecord) -> Result<()> {
        let key = normalize_email(&record.email);
        let mut users = self.users.write().await;

        if users.contains_key(&key) {
            return Err(RustyUsersError::Conflict("email already exists".to_string()));
        }

        log::info!("User created: {}", record.id);
        users.insert(key, record);
        Ok(())
    }
}

/// Create a new memory-based credential store
pub fn create_memory_credential_store() -> SharedCredentialStore {
    Arc::new(MemoryCredentialStore::new())
}

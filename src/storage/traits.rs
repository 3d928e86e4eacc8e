//! Abstract storage interfaces for pluggable backends

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::user::CredentialRecord;
use crate::error::Result;

/// User credential storage interface
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look a user up by email. `Ok(None)` means no such user; backend
    /// failures come back as `StoreUnavailable`.
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>>;

    /// Store a new user. Fails with `Conflict` if the email is taken.
    async fn insert(&self, record: CredentialRecord) -> Result<()>;
}

/// Shared reference to a credential store
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

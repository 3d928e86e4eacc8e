//! Storage backends for credentials and revoked tokens

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod token_revocation;
pub mod traits;

pub use memory::{create_memory_credential_store, MemoryCredentialStore};
pub use token_revocation::{
    create_memory_revocation_store, MemoryTokenRevocationStore, RevocationEntry,
    RevocationStats, RevocationSweeper, SharedTokenRevocationStore, TokenRevocationStore,
};
pub use traits::{CredentialStore, SharedCredentialStore};

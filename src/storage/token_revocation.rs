//! Token revocation storage and management
//!
//! Logged-out tokens are kept here until they could no longer pass
//! signature and expiry checks anyway. Entries are keyed by the SHA-256
//! digest of the token so the raw credential never sits in storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::auth::token::token_digest;
use crate::clock::SharedClock;
use crate::error::Result;

/// A blacklisted token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// SHA-256 digest of the token
    pub token_key: String,
    /// When the token was revoked
    pub created_at: DateTime<Utc>,
    /// When the entry may be swept; never before the token's own expiry
    pub expires_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn for_token(token: &str, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_key: token_digest(token),
            created_at,
            expires_at,
        }
    }
}

/// Token revocation storage trait
#[async_trait]
pub trait TokenRevocationStore: Send + Sync {
    /// Add a token to the revocation list.
    ///
    /// Re-adding a present token keeps the later of the two expiries.
    async fn revoke_token(&self, entry: RevocationEntry) -> Result<()>;

    /// Check if a token digest is on the list
    async fn is_token_revoked(&self, token_key: &str) -> Result<bool>;

    /// Remove every entry whose expiry is strictly before `now`
    async fn cleanup_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Get revocation statistics
    async fn get_revocation_stats(&self, now: DateTime<Utc>) -> Result<RevocationStats>;
}

/// Statistics about token revocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationStats {
    /// Total number of stored entries
    pub total_revoked: usize,
    /// Entries not yet past their expiry
    pub active_revocations: usize,
}

/// In-memory implementation of token revocation store
pub struct MemoryTokenRevocationStore {
    /// Map of token_key -> RevocationEntry
    revoked_tokens: RwLock<HashMap<String, RevocationEntry>>,
}

impl MemoryTokenRevocationStore {
    pub fn new() -> Self {
        Self {
            revoked_tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, swept or not
    pub async fn len(&self) -> usize {
        self.revoked_tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.revoked_tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenRevocationStore for MemoryTokenRevocationStore {
    async fn revoke_token(&self, entry: RevocationEntry) -> Result<()> {
        let mut revoked_tokens = self.revoked_tokens.write().await;

        match revoked_tokens.get_mut(&entry.token_key) {
            Some(existing) => {
                if entry.expires_at > existing.expires_at {
                    existing.expires_at = entry.expires_at;
                }
            }
            None => {
                revoked_tokens.insert(entry.token_key.clone(), entry);
            }
        }

        Ok(())
    }

    async fn is_token_revoked(&self, token_key: &str) -> Result<bool> {
        let revoked_tokens = self.revoked_tokens.read().await;
        Ok(revoked_tokens.contains_key(token_key))
    }

    async fn cleanup_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut revoked_tokens = self.revoked_tokens.write().await;
        let before = revoked_tokens.len();
        revoked_tokens.retain(|_, entry| entry.expires_at >= now);
        let removed_count = before - revoked_tokens.len();

        if removed_count > 0 {
            log::info!("Cleaned up {} expired token revocations", removed_count);
        }

        Ok(removed_count)
    }

    async fn get_revocation_stats(&self, now: DateTime<Utc>) -> Result<RevocationStats> {
        let revoked_tokens = self.revoked_tokens.read().await;
        let active_revocations = revoked_tokens
            .values()
            .filter(|entry| entry.expires_at >= now)
            .count();

        Ok(RevocationStats {
            total_revoked: revoked_tokens.len(),
            active_revocations,
        })
    }
}

impl Default for MemoryTokenRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared reference to token revocation store
pub type SharedTokenRevocationStore = Arc<dyn TokenRevocationStore>;

/// Create a new memory-based token revocation store
pub fn create_memory_revocation_store() -> SharedTokenRevocationStore {
    Arc::new(MemoryTokenRevocationStore::new())
}

/// Periodically removes expired revocation entries.
///
/// At most one sweep runs at a time; a sweep requested while another is
/// in flight is skipped.
pub struct RevocationSweeper {
    store: SharedTokenRevocationStore,
    clock: SharedClock,
    running: AtomicBool,
}

struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RevocationSweeper {
    pub fn new(store: SharedTokenRevocationStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            running: AtomicBool::new(false),
        }
    }

    /// Run one sweep now. Returns `None` when another sweep holds the guard.
    pub async fn run_once(&self) -> Result<Option<usize>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("Revocation sweep already in progress, skipping");
            return Ok(None);
        }
        let _guard = SweepGuard(&self.running);

        let now = self.clock.now();
        let removed = self.store.cleanup_expired_revocations(now).await?;
        let stats = self.store.get_revocation_stats(now).await?;
        log::debug!(
            "Revocation sweep removed {} entries, {} remain active",
            removed,
            stats.active_revocations
        );

        Ok(Some(removed))
    }

    /// Start background cleanup task
    pub fn start(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.run_once().await {
                    log::error!("Failed to cleanup expired token revocations: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn entry(token: &str, now: DateTime<Utc>, ttl: Duration) -> RevocationEntry {
        RevocationEntry::for_token(token, now, now + ttl)
    }

    #[tokio::test]
    async fn test_token_revocation() {
        let store = MemoryTokenRevocationStore::new();
        let now = Utc::now();

        store.revoke_token(entry("token_123", now, Duration::hours(1))).await.unwrap();

        assert!(store.is_token_revoked(&token_digest("token_123")).await.unwrap());
        assert!(!store.is_token_revoked(&token_digest("token_456")).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_keeps_later_expiry() {
        let store = MemoryTokenRevocationStore::new();
        let now = Utc::now();

        store.revoke_token(entry("tok", now, Duration::hours(2))).await.unwrap();
        store.revoke_token(entry("tok", now, Duration::hours(1))).await.unwrap();
        assert_eq!(store.len().await, 1);

        // Shorter re-add did not shorten the entry
        store.cleanup_expired_revocations(now + Duration::minutes(90)).await.unwrap();
        assert!(store.is_token_revoked(&token_digest("tok")).await.unwrap());

        store.revoke_token(entry("tok", now, Duration::hours(3))).await.unwrap();
        store.cleanup_expired_revocations(now + Duration::minutes(150)).await.unwrap();
        assert!(store.is_token_revoked(&token_digest("tok")).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let store = MemoryTokenRevocationStore::new();
        let now = Utc::now();

        store.revoke_token(entry("past", now, Duration::hours(-1))).await.unwrap();
        store.revoke_token(entry("boundary", now, Duration::zero())).await.unwrap();
        store.revoke_token(entry("future", now, Duration::hours(1))).await.unwrap();

        let removed = store.cleanup_expired_revocations(now).await.unwrap();
        assert_eq!(removed, 1);

        assert!(!store.is_token_revoked(&token_digest("past")).await.unwrap());
        assert!(store.is_token_revoked(&token_digest("boundary")).await.unwrap());
        assert!(store.is_token_revoked(&token_digest("future")).await.unwrap());
    }

    #[tokio::test]
    async fn test_revocation_stats() {
        let store = MemoryTokenRevocationStore::new();
        let now = Utc::now();

        store.revoke_token(entry("a", now, Duration::hours(-1))).await.unwrap();
        store.revoke_token(entry("b", now, Duration::hours(1))).await.unwrap();

        let stats = store.get_revocation_stats(now).await.unwrap();
        assert_eq!(stats.total_revoked, 2);
        assert_eq!(stats.active_revocations, 1);
    }

    #[tokio::test]
    async fn test_sweeper_uses_clock() {
        let start = Utc::now();
        let store = Arc::new(MemoryTokenRevocationStore::new());
        let clock = Arc::new(ManualClock::new(start));
        let sweeper = RevocationSweeper::new(store.clone(), clock.clone());

        store.revoke_token(entry("tok", start, Duration::hours(1))).await.unwrap();

        assert_eq!(sweeper.run_once().await.unwrap(), Some(0));
        clock.advance(Duration::hours(2));
        assert_eq!(sweeper.run_once().await.unwrap(), Some(1));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweeper_skips_when_busy() {
        let store = create_memory_revocation_store();
        let sweeper = RevocationSweeper::new(store, Arc::new(ManualClock::new(Utc::now())));

        sweeper.running.store(true, Ordering::Release);
        assert_eq!(sweeper.run_once().await.unwrap(), None);

        sweeper.running.store(false, Ordering::Release);
        assert_eq!(sweeper.run_once().await.unwrap(), Some(0));
    }
}

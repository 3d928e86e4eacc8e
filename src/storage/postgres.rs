//! PostgreSQL-backed stores
//!
//! Expected tables:
//!
//! ```sql
//! users(id TEXT PRIMARY KEY, firstname TEXT, lastname TEXT, email TEXT UNIQUE,
//!       password_hash TEXT, created_at TIMESTAMPTZ)
//! blacklisted_tokens(token_hash TEXT PRIMARY KEY, created_at TIMESTAMPTZ,
//!                    expires_at TIMESTAMPTZ)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::user::CredentialRecord;
use crate::error::{Result, RustyUsersError};
use crate::storage::memory::normalize_email;
use crate::storage::token_revocation::{RevocationEntry, RevocationStats, TokenRevocationStore};
use crate::storage::traits::CredentialStore;

/// Connectivity problems are retryable; anything else is a storage fault
fn classify(e: sqlx::Error) -> RustyUsersError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => RustyUsersError::StoreUnavailable(e.to_string()),
        other => RustyUsersError::StorageError(other.to_string()),
    }
}

/// Open a connection pool
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(classify)
}

type UserRow = (String, String, String, String, String, DateTime<Utc>);

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, firstname, lastname, email, password_hash, created_at
            FROM users
            WHERE lower(email) = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(
            |(id, firstname, lastname, email, password_hash, created_at)| CredentialRecord {
                id,
                firstname,
                lastname,
                email,
                password_hash,
                created_at,
            },
        ))
    }

    async fn insert(&self, record: CredentialRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, firstname, lastname, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.id)
        .bind(&record.firstname)
        .bind(&record.lastname)
        .bind(normalize_email(&record.email))
        .bind(&record.password_hash)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RustyUsersError::Conflict("email already exists".to_string())
            }
            other => classify(other),
        })?;

        Ok(())
    }
}

pub struct PgTokenRevocationStore {
    pool: PgPool,
}

impl PgTokenRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRevocationStore for PgTokenRevocationStore {
    async fn revoke_token(&self, entry: RevocationEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO blacklisted_tokens (token_hash, created_at, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash) DO UPDATE SET
                expires_at = GREATEST(blacklisted_tokens.expires_at, EXCLUDED.expires_at)
            "#,
        )
        .bind(&entry.token_key)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn is_token_revoked(&self, token_key: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE token_hash = $1)",
        )
        .bind(token_key)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn cleanup_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        Ok(result.rows_affected() as usize)
    }

    async fn get_revocation_stats(&self, now: DateTime<Utc>) -> Result<RevocationStats> {
        let (total, active) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE expires_at >= $1)
            FROM blacklisted_tokens
            "#,
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(RevocationStats {
            total_revoked: total as usize,
            active_revocations: active as usize,
        })
    }
}

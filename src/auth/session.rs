//! Login, logout and account operations built on the credential and
//! revocation stores

use chrono::{DateTime, Duration, Utc};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::password::PasswordHasher;
use crate::auth::token::{token_fingerprint, IssuedToken, TokenManager};
use crate::auth::user::{CredentialRecord, Identity, NewUser, User};
use crate::error::{Result, RustyUsersError};
use crate::security::AuthTimer;
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::token_revocation::{RevocationEntry, SharedTokenRevocationStore};
use crate::storage::traits::SharedCredentialStore;

pub struct SessionService {
    credentials: SharedCredentialStore,
    revocations: SharedTokenRevocationStore,
    tokens: Arc<TokenManager>,
    hasher: PasswordHasher,
    /// Minimum time a revoked token stays on the list
    revocation_ttl: Duration,
    /// Floor on login latency
    login_min_duration: std::time::Duration,
}

impl SessionService {
    pub fn new(
        credentials: SharedCredentialStore,
        revocations: SharedTokenRevocationStore,
        tokens: Arc<TokenManager>,
        revocation_ttl: Duration,
        login_min_duration: std::time::Duration,
    ) -> Self {
        Self {
            credentials,
            revocations,
            tokens,
            hasher: PasswordHasher::new(),
            revocation_ttl,
            login_min_duration,
        }
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remote: Option<SocketAddr>,
    ) -> Result<IssuedToken> {
        let timer = AuthTimer::new(self.login_min_duration);
        let outcome = self.check_credentials(email, password).await;
        timer.wait().await;

        match outcome {
            Ok(record) => {
                let issued = self.tokens.issue(&record.email)?;
                log_security_event(SecurityEvent::AuthenticationSuccess {
                    subject: record.email,
                    remote,
                })
                .await;
                Ok(issued)
            }
            Err(RustyUsersError::InvalidCredentials) => {
                log_security_event(SecurityEvent::AuthenticationFailed {
                    email: email.to_string(),
                    remote,
                })
                .await;
                Err(RustyUsersError::InvalidCredentials)
            }
            Err(e) => {
                log_security_event(SecurityEvent::StoreFault {
                    component: "credential_store".to_string(),
                    error: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<CredentialRecord> {
        let record = match self.credentials.find_by_email(email).await? {
            Some(record) => record,
            None => {
                self.hasher.verify_absent(password);
                return Err(RustyUsersError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &record.password_hash) {
            return Err(RustyUsersError::InvalidCredentials);
        }

        Ok(record)
    }

    /// Put a token on the revocation list.
    ///
    /// The entry outlives the token: it expires at the later of the token's
    /// own expiry and `now + revocation_ttl`. Tokens whose expiry cannot be
    /// trusted are kept for the longest window a genuine token could live.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let now = self.tokens.clock().now();
        let floor = later_by(now, self.revocation_ttl)?;

        let (subject, expires_at) = match self.tokens.verified_claims(token) {
            Ok(claims) => {
                let token_expiry = match claims.expires_at() {
                    Ok(at) => at,
                    Err(_) => later_by(now, self.tokens.ttl())?,
                };
                (Some(claims.sub), token_expiry.max(floor))
            }
            Err(e) => {
                log::debug!("Revoking unverifiable token: {}", e);
                (None, later_by(now, self.tokens.ttl().max(self.revocation_ttl))?)
            }
        };

        self.revocations
            .revoke_token(RevocationEntry::for_token(token, now, expires_at))
            .await?;

        log_security_event(SecurityEvent::TokenRevoked {
            subject,
            token_fingerprint: token_fingerprint(token),
        })
        .await;

        Ok(())
    }

    /// Create a user with a hashed password
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        if self.credentials.find_by_email(&new_user.email).await?.is_some() {
            return Err(RustyUsersError::Conflict("email already exists".to_string()));
        }

        let password_hash = self.hasher.hash(&new_user.password)?;
        let record = CredentialRecord::new(
            new_user.firstname.trim().to_string(),
            new_user.lastname.trim().to_string(),
            new_user.email.trim().to_string(),
            password_hash,
        );
        let user = User::from(&record);
        self.credentials.insert(record).await?;

        Ok(user)
    }

    /// Profile of the authenticated subject
    pub async fn profile(&self, identity: &Identity) -> Result<User> {
        self.credentials
            .find_by_email(&identity.subject)
            .await?
            .map(|record| User::from(&record))
            .ok_or_else(|| RustyUsersError::NotFound("user not found".to_string()))
    }
}

fn later_by(now: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(by).ok_or_else(|| {
        RustyUsersError::ConfigError(format!("Revocation window of {}s is out of range", by.num_seconds()))
    })
}

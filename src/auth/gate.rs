//! Per-request authorization decision
//!
//! A request is authorized only when its bearer token is absent from the
//! revocation list and passes signature and expiry checks. The revocation
//! list is consulted first. A revocation store that cannot answer denies
//! the request.

use std::fmt;
use std::sync::Arc;

use crate::auth::token::{extract_bearer_token, token_digest, token_fingerprint, TokenManager};
use crate::auth::user::Identity;
use crate::error::{Result, RustyUsersError};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::token_revocation::SharedTokenRevocationStore;

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    MissingHeader,
    MalformedHeader,
    Revoked,
    Expired,
    InvalidSignature,
    MalformedToken,
    StoreUnavailable,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MissingHeader => "missing_header",
            DenialReason::MalformedHeader => "malformed_header",
            DenialReason::Revoked => "revoked",
            DenialReason::Expired => "expired",
            DenialReason::InvalidSignature => "invalid_signature",
            DenialReason::MalformedToken => "malformed_token",
            DenialReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DenialReason> for RustyUsersError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::MissingHeader => RustyUsersError::MissingHeader,
            DenialReason::MalformedHeader => RustyUsersError::MalformedHeader,
            DenialReason::Revoked => RustyUsersError::Revoked,
            DenialReason::Expired => RustyUsersError::Expired,
            DenialReason::InvalidSignature => RustyUsersError::InvalidSignature,
            DenialReason::MalformedToken => {
                RustyUsersError::MalformedToken("Token could not be parsed".to_string())
            }
            DenialReason::StoreUnavailable => {
                RustyUsersError::StoreUnavailable("Revocation store unavailable".to_string())
            }
        }
    }
}

/// Terminal outcome of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized(Identity),
    Denied(DenialReason),
}

impl AuthDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthDecision::Authorized(_))
    }

    pub fn into_result(self) -> Result<Identity> {
        match self {
            AuthDecision::Authorized(identity) => Ok(identity),
            AuthDecision::Denied(reason) => Err(reason.into()),
        }
    }
}

/// Combines the revocation list and token validation into one decision
pub struct AuthorizationGate {
    tokens: Arc<TokenManager>,
    revocations: SharedTokenRevocationStore,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenManager>, revocations: SharedTokenRevocationStore) -> Self {
        Self {
            tokens,
            revocations,
        }
    }

    /// Evaluate the raw `Authorization` header of a request
    pub async fn authorize(&self, auth_header: Option<&str>) -> AuthDecision {
        let header = match auth_header {
            Some(header) => header,
            None => return AuthDecision::Denied(DenialReason::MissingHeader),
        };

        match extract_bearer_token(header) {
            Some(token) => self.check_token(&token).await,
            None => AuthDecision::Denied(DenialReason::MalformedHeader),
        }
    }

    /// Evaluate an already extracted token
    pub async fn check_token(&self, token: &str) -> AuthDecision {
        match self.revocations.is_token_revoked(&token_digest(token)).await {
            Ok(false) => {}
            Ok(true) => {
                self.record_denial(token, DenialReason::Revoked).await;
                return AuthDecision::Denied(DenialReason::Revoked);
            }
            Err(e) => {
                log_security_event(SecurityEvent::StoreFault {
                    component: "revocation_store".to_string(),
                    error: e.to_string(),
                })
                .await;
                return AuthDecision::Denied(DenialReason::StoreUnavailable);
            }
        }

        match self.tokens.validate(token) {
            Ok(identity) => AuthDecision::Authorized(identity),
            Err(e) => {
                let reason = match e {
                    RustyUsersError::Expired => DenialReason::Expired,
                    RustyUsersError::InvalidSignature => DenialReason::InvalidSignature,
                    _ => DenialReason::MalformedToken,
                };
                self.record_denial(token, reason).await;
                AuthDecision::Denied(reason)
            }
        }
    }

    async fn record_denial(&self, token: &str, reason: DenialReason) {
        log_security_event(SecurityEvent::TokenValidationFailed {
            token_fingerprint: token_fingerprint(token),
            reason: reason.to_string(),
        })
        .await;
    }
}

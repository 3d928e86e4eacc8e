use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::user::Identity;
use crate::clock::SharedClock;
use crate::constants::MAX_TOKEN_LENGTH;
use crate::error::{Result, RustyUsersError};

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Creates claims for a subject valid for `ttl` from `now`
    pub fn new(subject: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = now.timestamp();
        Self {
            sub: subject,
            iat,
            exp: iat + ttl.num_seconds(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Check if the token is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    pub fn issued_at(&self) -> Result<DateTime<Utc>> {
        timestamp_to_datetime(self.iat, "iat")
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        timestamp_to_datetime(self.exp, "exp")
    }
}

fn timestamp_to_datetime(secs: i64, claim: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| RustyUsersError::MalformedToken(format!("{} out of range", claim)))
}

/// A freshly signed token and the facts it carries
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates signed session tokens.
///
/// The signing key lives here and nowhere else; it is fixed for the
/// lifetime of the manager.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    has_key: bool,
    ttl: Duration,
    clock: SharedClock,
}

impl TokenManager {
    /// Creates a new token manager with a secret
    pub fn new(secret: &str, ttl: Duration, clock: SharedClock) -> Self {
        // Expiry is checked against our own clock, not jsonwebtoken's
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            has_key: !secret.is_empty(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Issues a token for `subject` valid for the configured TTL
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        if self.ttl <= Duration::zero() {
            return Err(RustyUsersError::SigningError(
                "Token TTL must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        if now.checked_add_signed(self.ttl).is_none() {
            return Err(RustyUsersError::SigningError(
                "Token expiry out of range".to_string(),
            ));
        }

        let claims = Claims::new(subject.to_string(), now, self.ttl);
        let token = self.generate_token(&claims)?;

        Ok(IssuedToken {
            token,
            subject: claims.sub.clone(),
            issued_at: claims.issued_at()?,
            expires_at: claims.expires_at()?,
        })
    }

    /// Generates a JWT token for the given claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        if !self.has_key {
            return Err(RustyUsersError::SigningError(
                "Signing key is unavailable".to_string(),
            ));
        }

        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| RustyUsersError::SigningError(format!("Failed to generate token: {}", e)))
    }

    /// Checks the signature and structure of a token without looking at expiry
    pub fn verified_claims(&self, token: &str) -> Result<Claims> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(RustyUsersError::MalformedToken("Token too long".to_string()));
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    RustyUsersError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => RustyUsersError::Expired,
                _ => RustyUsersError::MalformedToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(RustyUsersError::MalformedToken("Empty subject".to_string()));
        }
        if claims.exp <= claims.iat {
            return Err(RustyUsersError::MalformedToken(
                "Expiry precedes issue time".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Validates a token against the current clock
    pub fn validate(&self, token: &str) -> Result<Identity> {
        self.validate_at(token, self.clock.now())
    }

    /// Validates signature, structure and expiry at `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity> {
        let claims = self.verified_claims(token)?;

        if claims.is_expired_at(now) {
            return Err(RustyUsersError::Expired);
        }

        Ok(Identity {
            subject: claims.sub.clone(),
            token_id: claims.jti.clone(),
            issued_at: claims.issued_at()?,
            expires_at: claims.expires_at()?,
        })
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }

    Some(token.to_string())
}

/// Hex SHA-256 of a token, used as its key in revocation storage
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Short digest prefix for log lines
pub fn token_fingerprint(token: &str) -> String {
    token_digest(token)[..12].to_string()
}

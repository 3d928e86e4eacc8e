use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{Result, RustyUsersError};

/// Authenticated subject attached to a request once the gate lets it through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Subject the token was issued for (user email)
    pub subject: String,
    /// Unique token id (jti)
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Stored user record with its password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Unique user identifier
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    /// Login identity
    pub email: String,
    /// PHC-formatted password hash
    pub password_hash: String,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Creates a new record with a generated id
    pub fn new(firstname: String, lastname: String, email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            firstname,
            lastname,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a user, never carries the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&CredentialRecord> for User {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            id: record.id.clone(),
            firstname: record.firstname.clone(),
            lastname: record.lastname.clone(),
            email: record.email.clone(),
            created_at: record.created_at,
        }
    }
}

/// Fields accepted when creating a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Check required fields and basic formats
    pub fn validate(&self) -> Result<()> {
        if self.firstname.trim().is_empty() || self.lastname.trim().is_empty() {
            return Err(RustyUsersError::ValidationError(
                "firstname and lastname are required".to_string(),
            ));
        }

        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(RustyUsersError::ValidationError(
                    "a valid email is required".to_string(),
                ))
            }
        }

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(RustyUsersError::ValidationError(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        Ok(())
    }
}

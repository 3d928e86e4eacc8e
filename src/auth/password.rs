//! Password hashing with Argon2id

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{Result, RustyUsersError};

/// Well-formed hash no password matches, with the same cost parameters as
/// `Argon2::default()`. Verified against when an account does not exist.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// One-way salted password hashing
#[derive(Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password into a PHC string with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| RustyUsersError::HashingError(format!("Password hashing failed: {}", e)))
    }

    /// Check a password against a stored hash.
    ///
    /// Argon2 compares digests in constant time. An unparseable hash is
    /// treated as a mismatch.
    pub fn verify(&self, password: &str, password_hash: &str) -> bool {
        match PasswordHash::new(password_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                log::warn!("Stored password hash is unreadable: {}", e);
                false
            }
        }
    }

    /// Spend the same work as `verify` for an account that does not exist
    pub fn verify_absent(&self, password: &str) {
        let _ = self.verify(password, DUMMY_PASSWORD_HASH);
    }
}

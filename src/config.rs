//! Server configuration module
//! Loads startup parameters for the user service from the environment

use crate::constants::{
    DEFAULT_HOST, DEFAULT_LOGIN_MIN_DURATION_MS, DEFAULT_PORT, DEFAULT_REVOCATION_TTL_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_TOKEN_TTL_SECS, MAX_TTL_SECS,
};
use crate::error::{Result, RustyUsersError};
use std::env;
use std::time::Duration;

/// Account created at startup when both parts are configured
#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    pub email: String,
    pub password: String,
}

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JWT secret for token signing/validation
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
    /// Minimum time a logged-out token stays blacklisted
    pub revocation_ttl: Duration,
    /// How often expired blacklist entries are swept
    pub sweep_interval: Duration,
    /// Floor on login response time
    pub login_min_duration: Duration,
    /// Postgres connection string; in-memory stores when absent
    pub database_url: Option<String>,
    pub bootstrap_account: Option<BootstrapAccount>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed for security reasons. Use ServerConfig::from_env() instead.");
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Create a test configuration - DANGEROUS: Only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: "test-jwt-secret-only-for-unit-tests-never-use-in-production".to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            revocation_ttl: Duration::from_secs(DEFAULT_REVOCATION_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            login_min_duration: Duration::ZERO,
            database_url: None,
            bootstrap_account: None,
        }
    }

    /// Validate that a secret meets security requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(RustyUsersError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(RustyUsersError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RustyUsersError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols) for security".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = env::var("RUSTY_USERS_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env_parse("RUSTY_USERS_PORT", DEFAULT_PORT);

        let jwt_secret = env::var("RUSTY_USERS_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                RustyUsersError::ConfigError(
                    "JWT_SECRET environment variable is required for security. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_jwt_secret(&jwt_secret)?;

        let token_ttl_secs = env_parse("RUSTY_USERS_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS);
        if token_ttl_secs == 0 {
            return Err(RustyUsersError::ConfigError(
                "RUSTY_USERS_TOKEN_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        if token_ttl_secs > MAX_TTL_SECS {
            return Err(RustyUsersError::ConfigError(format!(
                "RUSTY_USERS_TOKEN_TTL_SECS must not exceed {}",
                MAX_TTL_SECS
            )));
        }

        let revocation_ttl_secs =
            env_parse("RUSTY_USERS_REVOCATION_TTL_SECS", DEFAULT_REVOCATION_TTL_SECS);
        if revocation_ttl_secs > MAX_TTL_SECS {
            return Err(RustyUsersError::ConfigError(format!(
                "RUSTY_USERS_REVOCATION_TTL_SECS must not exceed {}",
                MAX_TTL_SECS
            )));
        }

        let sweep_interval_secs =
            env_parse("RUSTY_USERS_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
        if sweep_interval_secs == 0 {
            return Err(RustyUsersError::ConfigError(
                "RUSTY_USERS_SWEEP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        let login_min_ms = env_parse("RUSTY_USERS_LOGIN_MIN_DURATION_MS", DEFAULT_LOGIN_MIN_DURATION_MS);

        let database_url = env::var("RUSTY_USERS_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .ok()
            .filter(|url| !url.is_empty());

        let bootstrap_account = match (
            env::var("RUSTY_USERS_BOOTSTRAP_EMAIL").ok(),
            env::var("RUSTY_USERS_BOOTSTRAP_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAccount { email, password }),
            (None, None) => None,
            _ => {
                return Err(RustyUsersError::ConfigError(
                    "RUSTY_USERS_BOOTSTRAP_EMAIL and RUSTY_USERS_BOOTSTRAP_PASSWORD must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            revocation_ttl: Duration::from_secs(revocation_ttl_secs),
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            login_min_duration: Duration::from_millis(login_min_ms),
            database_url,
            bootstrap_account,
        })
    }
}

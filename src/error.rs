use std::error::Error;
use std::fmt;

use warp::http::StatusCode;

/// Message returned for every login failure, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid email or password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RustyUsersError {
    // Credential errors
    InvalidCredentials,

    // Header errors
    MissingHeader,
    MalformedHeader,

    // Token errors
    Revoked,
    Expired,
    InvalidSignature,
    MalformedToken(String),

    // Internal faults
    SigningError(String),
    HashingError(String),

    // Storage errors
    StoreUnavailable(String),
    StorageError(String),

    // Request errors
    ValidationError(String),
    Conflict(String),
    NotFound(String),

    // Configuration errors
    ConfigError(String),
}

impl RustyUsersError {
    /// HTTP status reported for this error at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials
            | Self::MissingHeader
            | Self::Revoked
            | Self::Expired
            | Self::InvalidSignature
            | Self::MalformedToken(_) => StatusCode::UNAUTHORIZED,
            Self::MalformedHeader | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SigningError(_)
            | Self::HashingError(_)
            | Self::StorageError(_)
            | Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to API clients.
    ///
    /// Token failures collapse to a single message; the precise kind only
    /// goes to the security log.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
            Self::MissingHeader => "Authorization header is required".to_string(),
            Self::MalformedHeader => "Bearer token is required".to_string(),
            Self::Revoked | Self::Expired | Self::InvalidSignature | Self::MalformedToken(_) => {
                "Unauthorized".to_string()
            }
            Self::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            Self::ValidationError(msg) | Self::Conflict(msg) | Self::NotFound(msg) => msg.clone(),
            Self::SigningError(_)
            | Self::HashingError(_)
            | Self::StorageError(_)
            | Self::ConfigError(_) => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for RustyUsersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "{}", INVALID_CREDENTIALS_MESSAGE),
            Self::MissingHeader => write!(f, "Authorization header is missing"),
            Self::MalformedHeader => write!(f, "Authorization header is not a bearer token"),
            Self::Revoked => write!(f, "Token has been revoked"),
            Self::Expired => write!(f, "Token expired"),
            Self::InvalidSignature => write!(f, "Token signature is invalid"),
            Self::MalformedToken(msg) => write!(f, "Malformed token: {}", msg),
            Self::SigningError(msg) => write!(f, "Token signing error: {}", msg),
            Self::HashingError(msg) => write!(f, "Password hashing error: {}", msg),
            Self::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RustyUsersError {}

impl warp::reject::Reject for RustyUsersError {}

// Generic result type for RustyUsers
pub type Result<T> = std::result::Result<T, RustyUsersError>;

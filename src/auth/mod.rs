//! Authentication and authorization module

pub mod gate;
pub mod password;
pub mod session;
pub mod token;
pub mod user;

// Re-export main components
pub use gate::{AuthDecision, AuthorizationGate, DenialReason};
pub use password::PasswordHasher;
pub use session::SessionService;
pub use token::{extract_bearer_token, Claims, IssuedToken, TokenManager};
pub use user::{CredentialRecord, Identity, NewUser, User};

//! Rusty Users - user management backend with JWT sessions
//!
//! This library provides credential verification, token issuance and the
//! per-request authorization gate that combines token revocation with
//! signature and expiry checks.

pub mod auth;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod security;
pub mod security_logger;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;

// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const USERS_PATH: &str = "users";

// Token lifetimes (seconds)
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 86_400;
pub const DEFAULT_REVOCATION_TTL_SECS: u64 = 3_600;
/// Upper bound for either lifetime (ten years)
pub const MAX_TTL_SECS: u64 = 315_360_000;

// Background maintenance
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600;

// Minimum wall time for a login attempt, success or failure
pub const DEFAULT_LOGIN_MIN_DURATION_MS: u64 = 100;

// Input limits
pub const MAX_TOKEN_LENGTH: usize = 2048;
pub const MIN_PASSWORD_LENGTH: usize = 8;

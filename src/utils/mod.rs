pub mod jwt;
pub mod rate_limiter;
pub mod referral_code;
pub mod secret;

pub use jwt::*;
pub use rate_limiter::{GovernorLimiter, RateLimiter};
pub use referral_code::{generate_unique_referral_code, normalize_referral_input};
pub use secret::verify_shared_secret;

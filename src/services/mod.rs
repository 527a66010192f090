pub mod account_service;
pub mod admin_service;
pub mod check_in_service;
pub mod claim_service;
pub mod lucky_draw_service;
pub mod referral_service;
pub mod stats_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use account_service::*;
pub use admin_service::*;
pub use check_in_service::*;
pub use claim_service::*;
pub use lucky_draw_service::*;
pub use referral_service::*;
pub use stats_service::*;

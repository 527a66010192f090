pub mod account;
pub mod admin;
pub mod check_in;
pub mod claim;
pub mod common;
pub mod lucky_draw;
pub mod pagination;
pub mod stats;

pub use account::*;
pub use admin::*;
pub use check_in::*;
pub use claim::*;
pub use common::*;
pub use lucky_draw::*;
pub use pagination::*;
pub use stats::*;

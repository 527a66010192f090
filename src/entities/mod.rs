pub mod accounts;
pub mod claim_queue;
pub mod lucky_draw_history;
pub mod transaction_logs;

pub use accounts as account_entity;
pub use claim_queue as claim_entity;
pub use claim_queue::{ClaimSource, ClaimStatus};
pub use lucky_draw_history as draw_record_entity;
pub use transaction_logs as transaction_log_entity;
pub use transaction_logs::TransactionAction;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{TransactionAction, transaction_log_entity};

use super::PaginationParams;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminStatsResponse {
    pub total_accounts: u64,
    pub referred_accounts: u64,
    pub outstanding_tickets: i64,
    pub total_spins: u64,
    pub pending_claims: u64,
    pub claimed_claims: u64,
    pub check_ins_today: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct AccountQuery {
    /// 按 id / 昵称 / 推荐码模糊搜索
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AccountQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdjustTicketsRequest {
    /// 正数发放，负数扣除；结果不得小于 0
    pub delta: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SetInviteCountRequest {
    pub invite_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionLogResponse {
    pub id: i64,
    pub action: TransactionAction,
    pub amount_delta: i64,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<transaction_log_entity::Model> for TransactionLogResponse {
    fn from(m: transaction_log_entity::Model) -> Self {
        TransactionLogResponse {
            id: m.id,
            action: m.action,
            amount_delta: m.amount_delta,
            details: m.details,
            created_at: m.created_at,
        }
    }
}

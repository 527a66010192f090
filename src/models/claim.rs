use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ClaimSource, ClaimStatus, claim_entity};

use super::{PaginatedResponse, PaginationParams};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClaimResponse {
    pub id: i64,
    pub account_id: String,
    pub reward_id: String,
    pub reward_name: String,
    pub amount: i32,
    pub status: ClaimStatus,
    pub source: ClaimSource,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl From<claim_entity::Model> for ClaimResponse {
    fn from(m: claim_entity::Model) -> Self {
        ClaimResponse {
            id: m.id,
            account_id: m.account_id,
            reward_id: m.reward_id,
            reward_name: m.reward_name,
            amount: m.amount,
            status: m.status,
            source: m.source,
            created_at: m.created_at,
            claimed_at: m.claimed_at,
        }
    }
}

/// 领取记录查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct ClaimQuery {
    pub status: Option<ClaimStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ClaimQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }
}

/// 游戏服务器批量确认
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AcknowledgeRequest {
    pub claim_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcknowledgeResponse {
    /// 本次真正由 pending 转为 claimed 的数量（已领取/不存在的 id 不计入）
    pub acknowledged: u64,
}

pub type ClaimPageResponse = PaginatedResponse<ClaimResponse>;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{RarityTier, RewardConfig};
use crate::entities::draw_record_entity as record_entity;

use super::PaginatedResponse;

/// 奖品配置（展示用，带换算后的概率）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardResponse {
    pub id: String,
    pub name: String,
    pub rarity: RarityTier,
    /// 0.0 ~ 1.0
    pub probability: f64,
}

impl RewardResponse {
    pub fn from_config(reward: &RewardConfig, total_weight: f64) -> Self {
        RewardResponse {
            id: reward.id.clone(),
            name: reward.name.clone(),
            rarity: reward.rarity,
            probability: if total_weight > 0.0 {
                reward.weight / total_weight
            } else {
                0.0
            },
        }
    }
}

/// 抽中的奖品
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WonReward {
    pub id: String,
    pub name: String,
    pub rarity: RarityTier,
}

impl From<&RewardConfig> for WonReward {
    fn from(r: &RewardConfig) -> Self {
        WonReward {
            id: r.id.clone(),
            name: r.name.clone(),
            rarity: r.rarity,
        }
    }
}

/// 抽奖（Spin）响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpinResponse {
    pub reward: WonReward,
    /// 扣减后的剩余抽奖券
    pub remaining_tickets: i64,
}

/// 抽奖记录响应
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DrawRecordResponse {
    pub id: i64,
    pub reward_id: String,
    /// 奖品名称 (历史快照)
    pub reward_name: String,
    pub rarity: String,
    pub created_at: DateTime<Utc>,
}

impl From<record_entity::Model> for DrawRecordResponse {
    fn from(m: record_entity::Model) -> Self {
        DrawRecordResponse {
            id: m.id,
            reward_id: m.reward_id,
            reward_name: m.reward_name,
            rarity: m.rarity,
            created_at: m.created_at,
        }
    }
}

/// 首页滚动播报用的最近中奖
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecentWinResponse {
    pub display_name: String,
    pub reward_name: String,
    pub rarity: String,
    pub created_at: DateTime<Utc>,
}

pub type DrawRecordPageResponse = PaginatedResponse<DrawRecordResponse>;

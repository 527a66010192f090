use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::ReferralMilestone;
use crate::entities::account_entity;

use super::PaginatedResponse;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// 推荐人的推荐码（可选）
    #[schema(example = "PR-7KQ2ZD")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterResponse {
    /// 新账户自己的推荐码
    pub referral_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub invite_count: i64,
    pub ticket_count: i64,
    pub last_check_in: Option<NaiveDate>,
    pub group_affiliation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<account_entity::Model> for AccountResponse {
    fn from(m: account_entity::Model) -> Self {
        AccountResponse {
            id: m.id,
            display_name: m.display_name,
            avatar: m.avatar,
            referral_code: m.referral_code,
            referred_by: m.referred_by,
            invite_count: m.invite_count,
            ticket_count: m.ticket_count,
            last_check_in: m.last_check_in,
            group_affiliation: m.group_affiliation,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MilestoneResponse {
    pub invite_threshold: i64,
    pub reward_id: String,
    pub reward_name: String,
}

impl From<&ReferralMilestone> for MilestoneResponse {
    fn from(m: &ReferralMilestone) -> Self {
        MilestoneResponse {
            invite_threshold: m.invite_threshold,
            reward_id: m.reward_id.clone(),
            reward_name: m.reward_name.clone(),
        }
    }
}

/// 推荐进度：已达成的里程碑与下一个目标
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReferralProgress {
    pub invite_count: i64,
    pub reached: Vec<MilestoneResponse>,
    pub next: Option<MilestoneResponse>,
}

impl ReferralProgress {
    pub fn compute(invite_count: i64, milestones: &[ReferralMilestone]) -> Self {
        let reached = milestones
            .iter()
            .filter(|m| m.invite_threshold <= invite_count)
            .map(MilestoneResponse::from)
            .collect();
        let next = milestones
            .iter()
            .find(|m| m.invite_threshold > invite_count)
            .map(MilestoneResponse::from);
        ReferralProgress {
            invite_count,
            reached,
            next,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub account: AccountResponse,
    pub referral: ReferralProgress,
}

/// 被推荐人（只暴露展示信息）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReferralEntry {
    pub display_name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<account_entity::Model> for ReferralEntry {
    fn from(m: account_entity::Model) -> Self {
        ReferralEntry {
            display_name: m.display_name,
            avatar: m.avatar,
            created_at: m.created_at,
        }
    }
}

pub type ReferralPageResponse = PaginatedResponse<ReferralEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn milestones() -> Vec<ReferralMilestone> {
        [(3, "a"), (10, "b")]
            .into_iter()
            .map(|(n, id)| ReferralMilestone {
                invite_threshold: n,
                reward_id: id.to_string(),
                reward_name: id.to_uppercase(),
            })
            .collect()
    }

    #[test]
    fn test_referral_progress() {
        let p = ReferralProgress::compute(0, &milestones());
        assert!(p.reached.is_empty());
        assert_eq!(p.next.unwrap().invite_threshold, 3);

        let p = ReferralProgress::compute(3, &milestones());
        assert_eq!(p.reached.len(), 1);
        assert_eq!(p.next.unwrap().reward_id, "b");

        let p = ReferralProgress::compute(42, &milestones());
        assert_eq!(p.reached.len(), 2);
        assert!(p.next.is_none());
    }
}

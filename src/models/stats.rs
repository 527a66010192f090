use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GlobalMilestoneResponse {
    pub registration_threshold: i64,
    pub reward_name: String,
    pub reached: bool,
}

/// 预约总览（全服里程碑只做展示）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverviewResponse {
    pub total_registrations: u64,
    pub milestones: Vec<GlobalMilestoneResponse>,
}

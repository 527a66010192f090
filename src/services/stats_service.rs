use crate::config::GlobalMilestone;
use crate::entities::account_entity as accounts;
use crate::error::AppResult;
use crate::models::{GlobalMilestoneResponse, OverviewResponse};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use std::sync::Arc;

#[derive(Clone)]
pub struct StatsService {
    pool: DatabaseConnection,
    milestones: Arc<Vec<GlobalMilestone>>,
}

impl StatsService {
    pub fn new(pool: DatabaseConnection, milestones: Vec<GlobalMilestone>) -> Self {
        Self {
            pool,
            milestones: Arc::new(milestones),
        }
    }

    /// 预约人数与全服里程碑
    pub async fn overview(&self) -> AppResult<OverviewResponse> {
        let total_registrations = accounts::Entity::find().count(&self.pool).await?;

        let milestones = self
            .milestones
            .iter()
            .map(|m| GlobalMilestoneResponse {
                registration_threshold: m.registration_threshold,
                reward_name: m.reward_name.clone(),
                reached: total_registrations >= m.registration_threshold.max(0) as u64,
            })
            .collect();

        Ok(OverviewResponse {
            total_registrations,
            milestones,
        })
    }
}

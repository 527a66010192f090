use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 账户实体（一个 Discord 身份一行）
/// 说明:
/// - referral_code: 注册时分配，之后不可变
/// - referred_by: 推荐人的 referral_code，设置后不可变
/// - ticket_count: 抽奖券数量，任何时候都不能为负
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[sea_orm(unique)]
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub registration_ip: Option<String>,
    pub invite_count: i64,
    pub ticket_count: i64,
    pub last_check_in: Option<NaiveDate>,
    pub group_affiliation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// 今天（参考时区的日历日）是否已签到
    pub fn checked_in_on(&self, day: NaiveDate) -> bool {
        self.last_check_in == Some(day)
    }

    pub fn can_spin(&self) -> bool {
        self.ticket_count >= 1
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

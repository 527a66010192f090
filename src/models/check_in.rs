use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckInStatusResponse {
    pub checked_in_today: bool,
    pub last_check_in: Option<NaiveDate>,
    /// 下一次可签到的时间（参考时区的零点）
    pub next_reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckInResponse {
    pub granted: bool,
    pub ticket_count: i64,
}

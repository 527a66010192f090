use crate::entities::{
    TransactionAction, account_entity as accounts, transaction_log_entity as tx_logs,
};
use crate::error::{AppError, AppResult};
use crate::models::{CheckInResponse, CheckInStatusResponse};
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};

/// 每日签到：按参考时区的日历日判断，不是滚动 24 小时
#[derive(Clone)]
pub struct CheckInService {
    pool: DatabaseConnection,
    offset: FixedOffset,
}

impl CheckInService {
    pub fn new(pool: DatabaseConnection, utc_offset_minutes: i32) -> AppResult<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            AppError::ConfigError(format!("Invalid check-in UTC offset: {utc_offset_minutes}"))
        })?;
        Ok(Self { pool, offset })
    }

    /// 参考时区下的当天日期
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// 下一个参考时区零点（UTC 表示）
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = (self.today(now) + Days::new(1)).and_time(NaiveTime::MIN);
        let utc = midnight - chrono::Duration::seconds(self.offset.local_minus_utc() as i64);
        DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
    }

    pub async fn status(&self, account_id: &str) -> AppResult<CheckInStatusResponse> {
        let now = Utc::now();
        let account = accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not registered".to_string()))?;

        Ok(CheckInStatusResponse {
            checked_in_today: account.checked_in_on(self.today(now)),
            last_check_in: account.last_check_in,
            next_reset_at: self.next_reset(now),
        })
    }

    pub async fn check_in(&self, account_id: &str) -> AppResult<CheckInResponse> {
        self.check_in_at(account_id, Utc::now()).await
    }

    /// 签到
    ///
    /// 流程:
    /// 1. 锁定账户行 (FOR UPDATE) 并读取 last_check_in
    /// 2. 当天已签到 -> AlreadyCheckedIn
    /// 3. 写入 last_check_in = 今天，ticket_count + 1，记录流水
    pub async fn check_in_at(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CheckInResponse> {
        let today = self.today(now);
        let txn = self.pool.begin().await?;

        let account = accounts::Entity::find_by_id(account_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not registered".to_string()))?;

        if account.checked_in_on(today) {
            return Err(AppError::AlreadyCheckedIn);
        }

        // 条件更新：没有行锁的后端上同样保证一天只发一次
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::LastCheckIn, Expr::value(today))
            .col_expr(
                accounts::Column::TicketCount,
                Expr::col(accounts::Column::TicketCount).add(1),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(
                Condition::any()
                    .add(accounts::Column::LastCheckIn.is_null())
                    .add(accounts::Column::LastCheckIn.ne(today)),
            )
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(AppError::AlreadyCheckedIn);
        }

        tx_logs::ActiveModel {
            account_id: Set(account_id.to_string()),
            action: Set(TransactionAction::CheckIn),
            amount_delta: Set(1),
            details: Set(Some(format!("Daily check-in {today}"))),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!("Check-in granted: {account_id} ({today})");

        Ok(CheckInResponse {
            granted: true,
            ticket_count: account.ticket_count + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[tokio::test]
    async fn test_second_check_in_same_day_is_rejected() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = CheckInService::new(db.clone(), 0).unwrap();

        let first = svc
            .check_in_at("alice", at(2025, 9, 1, 8, 0))
            .await
            .unwrap();
        assert!(first.granted);
        assert_eq!(first.ticket_count, 1);

        let err = svc
            .check_in_at("alice", at(2025, 9, 1, 20, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyCheckedIn));

        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.ticket_count, 1);
        assert_eq!(
            alice.last_check_in,
            NaiveDate::from_ymd_opt(2025, 9, 1)
        );
        let logs = tx_logs::Entity::find().all(&db).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, TransactionAction::CheckIn);
    }

    #[tokio::test]
    async fn test_check_in_across_midnight_is_calendar_based() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = CheckInService::new(db.clone(), 0).unwrap();

        svc.check_in_at("alice", at(2025, 9, 1, 23, 59))
            .await
            .unwrap();
        let second = svc
            .check_in_at("alice", at(2025, 9, 2, 0, 1))
            .await
            .unwrap();
        assert_eq!(second.ticket_count, 2);
    }

    #[tokio::test]
    async fn test_check_in_unknown_account() {
        let db = setup_test_db().await;
        let svc = CheckInService::new(db, 0).unwrap();
        let err = svc.check_in("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_reference_timezone() {
        // UTC+8
        let db = DatabaseConnection::Disconnected;
        let svc = CheckInService::new(db, 8 * 60).unwrap();

        let now = at(2025, 9, 1, 17, 0);
        assert_eq!(svc.today(now), NaiveDate::from_ymd_opt(2025, 9, 2).unwrap());
        assert_eq!(svc.next_reset(now), at(2025, 9, 2, 16, 0));

        let svc = CheckInService::new(DatabaseConnection::Disconnected, 0).unwrap();
        assert_eq!(svc.next_reset(now), at(2025, 9, 2, 0, 0));

        assert!(CheckInService::new(DatabaseConnection::Disconnected, 24 * 60).is_err());
    }
}

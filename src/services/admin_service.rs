use crate::entities::{
    ClaimStatus, TransactionAction, account_entity as accounts, claim_entity as claims,
    draw_record_entity as records, transaction_log_entity as tx_logs,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::CheckInService;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Debug, FromQueryResult)]
struct TicketSum {
    total: i64,
}

/// 管理后台：统计、账户浏览与人工修正
#[derive(Clone)]
pub struct AdminService {
    pool: DatabaseConnection,
    check_in_service: CheckInService,
}

impl AdminService {
    pub fn new(pool: DatabaseConnection, check_in_service: CheckInService) -> Self {
        Self {
            pool,
            check_in_service,
        }
    }

    pub async fn stats(&self) -> AppResult<AdminStatsResponse> {
        let total_accounts = accounts::Entity::find().count(&self.pool).await?;
        let referred_accounts = accounts::Entity::find()
            .filter(accounts::Column::ReferredBy.is_not_null())
            .count(&self.pool)
            .await?;

        let outstanding_tickets = accounts::Entity::find()
            .select_only()
            .column_as(
                Expr::cust("CAST(COALESCE(SUM(ticket_count), 0) AS BIGINT)"),
                "total",
            )
            .into_model::<TicketSum>()
            .one(&self.pool)
            .await?
            .map(|s| s.total)
            .unwrap_or(0);

        let total_spins = records::Entity::find().count(&self.pool).await?;
        let pending_claims = claims::Entity::find()
            .filter(claims::Column::Status.eq(ClaimStatus::Pending))
            .count(&self.pool)
            .await?;
        let claimed_claims = claims::Entity::find()
            .filter(claims::Column::Status.eq(ClaimStatus::Claimed))
            .count(&self.pool)
            .await?;

        let today = self.check_in_service.today(Utc::now());
        let check_ins_today = accounts::Entity::find()
            .filter(accounts::Column::LastCheckIn.eq(today))
            .count(&self.pool)
            .await?;

        Ok(AdminStatsResponse {
            total_accounts,
            referred_accounts,
            outstanding_tickets,
            total_spins,
            pending_claims,
            claimed_claims,
            check_ins_today,
        })
    }

    /// 账户列表（按 id / 昵称 / 推荐码搜索）
    pub async fn list_accounts(
        &self,
        query: &AccountQuery,
    ) -> AppResult<PaginatedResponse<AccountResponse>> {
        let params = query.pagination();
        let mut base_query = accounts::Entity::find();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            base_query = base_query.filter(
                Condition::any()
                    .add(accounts::Column::Id.contains(search))
                    .add(accounts::Column::DisplayName.contains(search))
                    .add(accounts::Column::ReferralCode.contains(search.to_uppercase())),
            );
        }

        let total = base_query.clone().count(&self.pool).await?;

        let models = base_query
            .order_by_desc(accounts::Column::CreatedAt)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items: Vec<AccountResponse> = models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// 人工调整抽奖券（锁行，结果不得为负）
    pub async fn adjust_tickets(
        &self,
        admin_id: &str,
        account_id: &str,
        request: AdjustTicketsRequest,
    ) -> AppResult<AccountResponse> {
        if request.delta == 0 {
            return Err(AppError::ValidationError("delta must not be zero".into()));
        }

        let txn = self.pool.begin().await?;

        let account = accounts::Entity::find_by_id(account_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        let new_count = account
            .ticket_count
            .checked_add(request.delta)
            .filter(|n| *n >= 0)
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Ticket count cannot go below zero (current {})",
                    account.ticket_count
                ))
            })?;

        let mut am = account.into_active_model();
        am.ticket_count = Set(new_count);
        let updated = am.update(&txn).await?;

        let reason = request.reason.unwrap_or_default();
        tx_logs::ActiveModel {
            account_id: Set(account_id.to_string()),
            action: Set(TransactionAction::AdminAdjust),
            amount_delta: Set(request.delta),
            details: Set(Some(format!("by {admin_id}: {reason}"))),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Admin {admin_id} adjusted tickets of {account_id} by {} -> {new_count}",
            request.delta
        );

        Ok(updated.into())
    }

    /// 人工修正邀请数（不会重新评估里程碑）
    pub async fn set_invite_count(
        &self,
        admin_id: &str,
        account_id: &str,
        request: SetInviteCountRequest,
    ) -> AppResult<AccountResponse> {
        if request.invite_count < 0 {
            return Err(AppError::ValidationError(
                "invite_count must not be negative".into(),
            ));
        }

        let txn = self.pool.begin().await?;

        let account = accounts::Entity::find_by_id(account_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        let previous = account.invite_count;

        let mut am = account.into_active_model();
        am.invite_count = Set(request.invite_count);
        let updated = am.update(&txn).await?;

        tx_logs::ActiveModel {
            account_id: Set(account_id.to_string()),
            action: Set(TransactionAction::AdminAdjust),
            amount_delta: Set(0),
            details: Set(Some(format!(
                "by {admin_id}: invite_count {previous} -> {}",
                request.invite_count
            ))),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Admin {admin_id} set invite_count of {account_id}: {previous} -> {}",
            request.invite_count
        );

        Ok(updated.into())
    }

    /// 账户流水（倒序）
    pub async fn transactions(
        &self,
        account_id: &str,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<TransactionLogResponse>> {
        let base_query = tx_logs::Entity::find().filter(tx_logs::Column::AccountId.eq(account_id));

        let total = base_query.clone().count(&self.pool).await?;

        let models = base_query
            .order_by_desc(tx_logs::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items: Vec<TransactionLogResponse> = models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(items, params, total))
    }
}

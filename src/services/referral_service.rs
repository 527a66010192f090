use crate::config::{ReferralConfig, ReferralMilestone};
use crate::entities::{
    ClaimSource, ClaimStatus, TransactionAction, account_entity as accounts,
    claim_entity as claims, transaction_log_entity as tx_logs,
};
use crate::error::AppResult;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use std::sync::Arc;

/// 推荐归属与推荐里程碑发放
///
/// 所有方法都接收调用方的连接/事务，自身不开启事务：
/// 推荐人的计数、里程碑奖励必须和新账户的插入一起提交或一起回滚。
#[derive(Clone)]
pub struct ReferralService {
    config: Arc<ReferralConfig>,
}

impl ReferralService {
    pub fn new(config: ReferralConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn code_prefix(&self) -> &str {
        &self.config.code_prefix
    }

    /// 升序排列的推荐里程碑
    pub fn milestones(&self) -> &[ReferralMilestone] {
        &self.config.milestones
    }

    /// 解析推荐人；以下情况静默放弃推荐关系（注册本身照常进行）:
    /// - 推荐码不存在
    /// - 推荐自己（推荐人就是当前身份，或推荐码就是新账户自己的码）
    /// - 同一 IP 已经产生了 max_referrals_per_ip 次成功推荐
    pub async fn resolve_referrer<C>(
        &self,
        db: &C,
        new_account_id: &str,
        new_referral_code: &str,
        referral_input: Option<&str>,
        client_ip: Option<&str>,
    ) -> AppResult<Option<accounts::Model>>
    where
        C: ConnectionTrait,
    {
        let Some(code) = referral_input else {
            return Ok(None);
        };

        if code == new_referral_code {
            log::info!("Self referral ignored for {new_account_id}");
            return Ok(None);
        }

        let Some(referrer) = accounts::Entity::find()
            .filter(accounts::Column::ReferralCode.eq(code))
            .one(db)
            .await?
        else {
            log::info!("Unknown referral code {code} used by {new_account_id}");
            return Ok(None);
        };

        if referrer.id == new_account_id {
            log::info!("Self referral ignored for {new_account_id}");
            return Ok(None);
        }

        if let Some(ip) = client_ip {
            let attributed = accounts::Entity::find()
                .filter(accounts::Column::RegistrationIp.eq(ip))
                .filter(accounts::Column::ReferredBy.is_not_null())
                .count(db)
                .await?;
            if attributed >= self.config.max_referrals_per_ip {
                log::warn!(
                    "Referral from {ip} dropped: {attributed} referrals already attributed to this IP"
                );
                return Ok(None);
            }
        }

        Ok(Some(referrer))
    }

    /// 推荐人 invite_count / ticket_count 各 +1，返回更新后的 invite_count
    pub async fn credit_referrer<C>(
        &self,
        db: &C,
        referrer_id: &str,
        new_account_id: &str,
    ) -> AppResult<i64>
    where
        C: ConnectionTrait,
    {
        // 单条 UPDATE 自增；Postgres 下该行锁持有到事务提交，同一推荐人的并发注册在此串行
        accounts::Entity::update_many()
            .col_expr(
                accounts::Column::InviteCount,
                Expr::col(accounts::Column::InviteCount).add(1),
            )
            .col_expr(
                accounts::Column::TicketCount,
                Expr::col(accounts::Column::TicketCount).add(1),
            )
            .filter(accounts::Column::Id.eq(referrer_id))
            .exec(db)
            .await?;

        tx_logs::ActiveModel {
            account_id: Set(referrer_id.to_string()),
            action: Set(TransactionAction::ReferralBonus),
            amount_delta: Set(1),
            details: Set(Some(format!("Referral of {new_account_id}"))),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let invite_count = accounts::Entity::find_by_id(referrer_id.to_string())
            .one(db)
            .await?
            .map(|a| a.invite_count)
            .unwrap_or(0);
        Ok(invite_count)
    }

    /// 为已达到的每个里程碑写入一条 pending 奖励
    ///
    /// 幂等键是 (account_id, reward_id)：在同一事务内先查是否已有该奖励
    /// （无论 pending 还是 claimed），没有才插入。重复执行不会产生第二条。
    pub async fn award_milestones<C>(
        &self,
        db: &C,
        account_id: &str,
        invite_count: i64,
    ) -> AppResult<Vec<claims::Model>>
    where
        C: ConnectionTrait,
    {
        let mut awarded = Vec::new();

        for milestone in self
            .config
            .milestones
            .iter()
            .filter(|m| m.invite_threshold <= invite_count)
        {
            let existing = claims::Entity::find()
                .filter(claims::Column::AccountId.eq(account_id))
                .filter(claims::Column::RewardId.eq(milestone.reward_id.as_str()))
                .count(db)
                .await?;
            if existing > 0 {
                continue;
            }

            let claim = claims::ActiveModel {
                account_id: Set(account_id.to_string()),
                reward_id: Set(milestone.reward_id.clone()),
                reward_name: Set(milestone.reward_name.clone()),
                amount: Set(1),
                status: Set(ClaimStatus::Pending),
                source: Set(ClaimSource::ReferralMilestone),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;

            log::info!(
                "Referral milestone {} reached by {account_id} ({invite_count} invites)",
                milestone.reward_id
            );
            awarded.push(claim);
        }

        Ok(awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;
    use sea_orm::TransactionTrait;

    fn service(max_per_ip: u64) -> ReferralService {
        ReferralService::new(ReferralConfig {
            code_prefix: "PR-".to_string(),
            max_referrals_per_ip: max_per_ip,
            milestones: vec![
                ReferralMilestone {
                    invite_threshold: 1,
                    reward_id: "first".to_string(),
                    reward_name: "First Invite".to_string(),
                },
                ReferralMilestone {
                    invite_threshold: 3,
                    reward_id: "third".to_string(),
                    reward_name: "Third Invite".to_string(),
                },
            ],
        })
    }

    #[tokio::test]
    async fn test_award_milestones_is_idempotent() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = service(3);

        let first = svc.award_milestones(&db, "alice", 3).await.unwrap();
        assert_eq!(first.len(), 2);

        // 同一推荐事件重放（例如重试）
        let txn = db.begin().await.unwrap();
        let again = svc.award_milestones(&txn, "alice", 3).await.unwrap();
        txn.commit().await.unwrap();
        assert!(again.is_empty());

        let rows = claims::Entity::find()
            .filter(claims::Column::AccountId.eq("alice"))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|c| c.source == ClaimSource::ReferralMilestone));
    }

    #[tokio::test]
    async fn test_award_milestones_only_reached_thresholds() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = service(3);

        assert!(svc.award_milestones(&db, "alice", 0).await.unwrap().is_empty());
        let awarded = svc.award_milestones(&db, "alice", 2).await.unwrap();
        assert_eq!(awarded.len(), 1);
        assert_eq!(awarded[0].reward_id, "first");
    }

    #[tokio::test]
    async fn test_resolve_referrer_rules() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = service(3);

        let found = svc
            .resolve_referrer(&db, "bob", "PR-BOB001", Some("PR-ALICE1"), Some("10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(found.map(|a| a.id), Some("alice".to_string()));

        let unknown = svc
            .resolve_referrer(&db, "bob", "PR-BOB001", Some("PR-NOPE00"), Some("10.0.0.1"))
            .await
            .unwrap();
        assert!(unknown.is_none());

        let own_code = svc
            .resolve_referrer(&db, "bob", "PR-BOB001", Some("PR-BOB001"), None)
            .await
            .unwrap();
        assert!(own_code.is_none());

        let self_id = svc
            .resolve_referrer(&db, "alice", "PR-OTHER1", Some("PR-ALICE1"), None)
            .await
            .unwrap();
        assert!(self_id.is_none());
    }

    #[tokio::test]
    async fn test_credit_referrer_increments_both_counters() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 2).await;
        let svc = service(3);

        let invites = svc.credit_referrer(&db, "alice", "bob").await.unwrap();
        assert_eq!(invites, 1);
        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.ticket_count, 3);
        assert_eq!(alice.invite_count, 1);

        let logs = tx_logs::Entity::find().all(&db).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, TransactionAction::ReferralBonus);
        assert_eq!(logs[0].amount_delta, 1);
    }
}

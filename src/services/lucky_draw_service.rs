use crate::config::{LuckyDrawConfig, RewardConfig};
use crate::entities::{
    ClaimSource, ClaimStatus, TransactionAction, account_entity as accounts,
    claim_entity as claims, draw_record_entity as records, transaction_log_entity as tx_logs,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    DrawRecordPageResponse, DrawRecordResponse, PaginatedResponse, PaginationParams,
    RecentWinResponse, RewardResponse, SpinResponse, WonReward,
};
use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

/// 累积权重选择：第一个累积权重 > roll 的奖品胜出；
/// 浮点误差导致遍历结束仍未命中时，取配置中的最后一个
pub fn pick_reward(rewards: &[RewardConfig], roll: f64) -> Option<&RewardConfig> {
    let mut acc = 0.0;
    for reward in rewards {
        acc += reward.weight;
        if roll < acc {
            return Some(reward);
        }
    }
    rewards.last()
}

#[derive(Clone)]
pub struct LuckyDrawService {
    pool: DatabaseConnection,
    config: Arc<LuckyDrawConfig>,
}

impl LuckyDrawService {
    pub fn new(pool: DatabaseConnection, config: LuckyDrawConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    fn total_weight(&self) -> f64 {
        self.config.rewards.iter().map(|r| r.weight).sum()
    }

    /// 奖品列表（含换算后的概率）
    pub fn list_rewards(&self) -> Vec<RewardResponse> {
        let total = self.total_weight();
        self.config
            .rewards
            .iter()
            .map(|r| RewardResponse::from_config(r, total))
            .collect()
    }

    /// 抽奖 (Spin)，roll ~ Uniform[0, totalWeight)
    pub async fn spin(&self, account_id: &str) -> AppResult<SpinResponse> {
        self.spin_with_roll(account_id, |total| {
            rand::thread_rng().gen_range(0.0..total)
        })
        .await
    }

    /// 抽奖
    ///
    /// 逻辑（单个事务，锁定账户行）:
    /// 1. SELECT ... FOR UPDATE 读取 ticket_count，不足 1 张 -> InsufficientTickets
    /// 2. 按累积权重选出奖品
    /// 3. 扣减 1 张（条件更新 ticket_count >= 1）
    /// 4. 写抽奖记录、流水、pending 领取记录
    /// 5. 提交，返回奖品与剩余抽奖券
    pub async fn spin_with_roll<F>(&self, account_id: &str, roll: F) -> AppResult<SpinResponse>
    where
        F: FnOnce(f64) -> f64,
    {
        let total = self.total_weight();
        if self.config.rewards.is_empty() || total <= 0.0 {
            return Err(AppError::InternalError(
                "No lucky draw rewards configured".into(),
            ));
        }

        let txn = self.pool.begin().await?;

        let account = accounts::Entity::find_by_id(account_id.to_string())
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not registered".to_string()))?;

        if !account.can_spin() {
            return Err(AppError::InsufficientTickets);
        }

        let reward = pick_reward(&self.config.rewards, roll(total))
            .ok_or_else(|| AppError::InternalError("Reward selection failed".into()))?;

        // 乐观扣减：update where ticket_count >= 1
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::TicketCount,
                Expr::col(accounts::Column::TicketCount).sub(1),
            )
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::TicketCount.gte(1))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(AppError::InsufficientTickets);
        }

        let now = Utc::now();

        records::ActiveModel {
            account_id: Set(account_id.to_string()),
            reward_id: Set(reward.id.clone()),
            reward_name: Set(reward.name.clone()),
            rarity: Set(reward.rarity.to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        tx_logs::ActiveModel {
            account_id: Set(account_id.to_string()),
            action: Set(TransactionAction::Spin),
            amount_delta: Set(-1),
            details: Set(Some(format!("Won {}", reward.id))),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        claims::ActiveModel {
            account_id: Set(account_id.to_string()),
            reward_id: Set(reward.id.clone()),
            reward_name: Set(reward.name.clone()),
            amount: Set(1),
            status: Set(ClaimStatus::Pending),
            source: Set(ClaimSource::LuckyDraw),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "Spin by {account_id}: {} ({})",
            reward.id,
            reward.rarity
        );

        Ok(SpinResponse {
            reward: WonReward::from(reward),
            remaining_tickets: account.ticket_count - 1,
        })
    }

    /// 获取抽奖记录（分页）
    pub async fn history(
        &self,
        account_id: &str,
        params: &PaginationParams,
    ) -> AppResult<DrawRecordPageResponse> {
        let base_query = records::Entity::find().filter(records::Column::AccountId.eq(account_id));

        let total = base_query.clone().count(&self.pool).await?;

        let items_models = base_query
            .order_by(records::Column::CreatedAt, Order::Desc)
            .order_by(records::Column::Id, Order::Desc)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items: Vec<DrawRecordResponse> = items_models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(items, params, total))
    }

    /// 最近中奖（只用于页面展示，读取失败返回空列表）
    pub async fn recent_wins(&self) -> Vec<RecentWinResponse> {
        match self.load_recent_wins().await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Failed to load recent wins: {e}");
                Vec::new()
            }
        }
    }

    async fn load_recent_wins(&self) -> AppResult<Vec<RecentWinResponse>> {
        let recent = records::Entity::find()
            .order_by_desc(records::Column::CreatedAt)
            .order_by_desc(records::Column::Id)
            .limit(self.config.recent_limit)
            .all(&self.pool)
            .await?;
        if recent.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = recent.iter().map(|r| r.account_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let names: HashMap<String, String> = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|a| (a.id, a.display_name))
            .collect();

        Ok(recent
            .into_iter()
            .map(|r| RecentWinResponse {
                display_name: names.get(&r.account_id).cloned().unwrap_or_default(),
                reward_name: r.reward_name,
                rarity: r.rarity,
                created_at: r.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RarityTier;
    use crate::services::test_support::*;

    fn rewards() -> Vec<RewardConfig> {
        [
            ("common", 60.0, RarityTier::Common),
            ("rare", 30.0, RarityTier::Rare),
            ("epic", 9.0, RarityTier::Epic),
            ("legendary", 1.0, RarityTier::Legendary),
        ]
        .into_iter()
        .map(|(id, weight, rarity)| RewardConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            weight,
            rarity,
        })
        .collect()
    }

    fn service(db: &DatabaseConnection) -> LuckyDrawService {
        LuckyDrawService::new(
            db.clone(),
            LuckyDrawConfig {
                rewards: rewards(),
                recent_limit: 5,
            },
        )
    }

    #[test]
    fn test_pick_reward_boundaries() {
        let list = rewards();
        assert_eq!(pick_reward(&list, 0.0).unwrap().id, "common");
        assert_eq!(pick_reward(&list, 59.999).unwrap().id, "common");
        assert_eq!(pick_reward(&list, 60.0).unwrap().id, "rare");
        assert_eq!(pick_reward(&list, 99.5).unwrap().id, "legendary");
        // roll 恰好等于总权重：遍历结束未命中，回退到最后一个
        assert_eq!(pick_reward(&list, 100.0).unwrap().id, "legendary");
        assert!(pick_reward(&[], 1.0).is_none());
    }

    #[test]
    fn test_pick_reward_distribution() {
        let list = rewards();
        let mut rng = rand::thread_rng();
        let mut counts: HashMap<&str, u32> = HashMap::new();
        let samples = 100_000;
        for _ in 0..samples {
            let reward = pick_reward(&list, rng.gen_range(0.0..100.0)).unwrap();
            *counts.entry(reward.id.as_str()).or_default() += 1;
        }

        // 容差取 ~5 个标准差
        for (id, expected, tolerance) in [
            ("common", 0.60, 0.008),
            ("rare", 0.30, 0.008),
            ("epic", 0.09, 0.005),
            ("legendary", 0.01, 0.002),
        ] {
            let observed = counts.get(id).copied().unwrap_or(0) as f64 / samples as f64;
            assert!(
                (observed - expected).abs() < tolerance,
                "{id}: observed {observed}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_list_rewards_probability() {
        let svc = service(&DatabaseConnection::Disconnected);
        let list = svc.list_rewards();
        assert_eq!(list.len(), 4);
        assert!((list[0].probability - 0.6).abs() < 1e-9);
        assert!((list[3].probability - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_spin_without_tickets() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        let svc = service(&db);

        let err = svc.spin("alice").await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientTickets));
        assert_eq!(records::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(claims::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spin_writes_record_log_and_claim() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 2).await;
        let svc = service(&db);

        let resp = svc.spin_with_roll("alice", |_| 65.0).await.unwrap();
        assert_eq!(resp.reward.id, "rare");
        assert_eq!(resp.remaining_tickets, 1);
        assert_eq!(find_account(&db, "alice").await.ticket_count, 1);

        let claim = claims::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(claim.reward_id, "rare");
        assert_eq!(claim.amount, 1);
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.source, ClaimSource::LuckyDraw);

        let log = tx_logs::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(log.action, TransactionAction::Spin);
        assert_eq!(log.amount_delta, -1);

        let history = svc
            .history("alice", &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(history.data[0].reward_name, "RARE");
        assert_eq!(history.data[0].rarity, "rare");
    }

    #[tokio::test]
    async fn test_concurrent_spins_with_one_ticket() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 1).await;
        let svc = service(&db);

        let (a, b) = tokio::join!(svc.spin("alice"), svc.spin("alice"));
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if a.is_err() { a } else { b };
        assert!(matches!(failure, Err(AppError::InsufficientTickets)));

        assert_eq!(find_account(&db, "alice").await.ticket_count, 0);
        assert_eq!(records::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(claims::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_wins_include_display_name() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 1).await;
        seed_account(&db, "bob", "PR-BOB001", 1).await;
        let svc = service(&db);

        svc.spin_with_roll("alice", |_| 0.0).await.unwrap();
        svc.spin_with_roll("bob", |_| 99.9).await.unwrap();

        let wins = svc.recent_wins().await;
        assert_eq!(wins.len(), 2);
        let bob = wins.iter().find(|w| w.reward_name == "LEGENDARY").unwrap();
        assert_eq!(bob.display_name, "bob display");
    }

    #[tokio::test]
    async fn test_recent_wins_fail_soft() {
        // 没有建表的空库：查询必然报错
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let svc = service(&db);
        assert!(svc.load_recent_wins().await.is_err());
        assert!(svc.recent_wins().await.is_empty());
    }
}

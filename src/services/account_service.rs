use crate::entities::account_entity as accounts;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::models::*;
use crate::services::ReferralService;
use crate::utils::{Identity, generate_unique_referral_code, normalize_referral_input};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct AccountService {
    pool: DatabaseConnection,
    referral_service: ReferralService,
}

impl AccountService {
    pub fn new(pool: DatabaseConnection, referral_service: ReferralService) -> Self {
        Self {
            pool,
            referral_service,
        }
    }

    /// 注册（创建账户 + 推荐归属）
    ///
    /// 流程:
    /// 1. 校验 Discord 服务器成员身份与推荐码格式
    /// 2. 已有账户直接返回 AlreadyRegistered
    /// 3. 生成推荐码（查重只是建议，唯一索引兜底）
    /// 4. 单个事务内：推荐人 +1 邀请 / +1 抽奖券、发放里程碑奖励、插入新账户
    pub async fn register(
        &self,
        identity: &Identity,
        request: RegisterRequest,
        client_ip: Option<&str>,
    ) -> AppResult<RegisterResponse> {
        if !identity.in_guild {
            return Err(AppError::Forbidden(
                "Join the Discord server before registering".to_string(),
            ));
        }
        let referral_input = normalize_referral_input(request.referral_code.as_deref())?;

        if self.exists(&identity.id).await? {
            return Err(AppError::AlreadyRegistered);
        }

        let referral_code =
            generate_unique_referral_code(&self.pool, self.referral_service.code_prefix()).await?;

        self.register_with_code(identity, referral_input.as_deref(), client_ip, referral_code)
            .await
    }

    pub(crate) async fn register_with_code(
        &self,
        identity: &Identity,
        referral_input: Option<&str>,
        client_ip: Option<&str>,
        referral_code: String,
    ) -> AppResult<RegisterResponse> {
        let txn = self.pool.begin().await?;

        let referrer = self
            .referral_service
            .resolve_referrer(&txn, &identity.id, &referral_code, referral_input, client_ip)
            .await?;

        if let Some(referrer) = &referrer {
            let invite_count = self
                .referral_service
                .credit_referrer(&txn, &referrer.id, &identity.id)
                .await?;
            self.referral_service
                .award_milestones(&txn, &referrer.id, invite_count)
                .await?;
        }

        let insert_result = accounts::ActiveModel {
            id: Set(identity.id.clone()),
            display_name: Set(identity.display_name.clone()),
            avatar: Set(identity.avatar.clone()),
            referral_code: Set(referral_code.clone()),
            referred_by: Set(referrer.as_ref().map(|r| r.referral_code.clone())),
            registration_ip: Set(client_ip.map(String::from)),
            invite_count: Set(0),
            ticket_count: Set(0),
            last_check_in: Set(None),
            group_affiliation: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await;

        if let Err(err) = insert_result {
            // 事务已失效，先回滚再判断是哪种冲突
            txn.rollback().await?;
            if is_unique_violation(&err) {
                if self.exists(&identity.id).await? {
                    return Err(AppError::AlreadyRegistered);
                }
                return Err(AppError::Transient(format!(
                    "Referral code collision for {}",
                    identity.id
                )));
            }
            return Err(err.into());
        }

        txn.commit().await?;

        log::info!(
            "Account registered: {} (referred by {})",
            identity.id,
            referrer.as_ref().map(|r| r.id.as_str()).unwrap_or("-")
        );

        Ok(RegisterResponse { referral_code })
    }

    pub async fn exists(&self, account_id: &str) -> AppResult<bool> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::Id.eq(account_id))
            .count(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn find(&self, account_id: &str) -> AppResult<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not registered".to_string()))
    }

    /// 个人资料 + 推荐进度
    pub async fn get_profile(&self, account_id: &str) -> AppResult<ProfileResponse> {
        let account = self.find(account_id).await?;
        let referral =
            ReferralProgress::compute(account.invite_count, self.referral_service.milestones());
        Ok(ProfileResponse {
            account: account.into(),
            referral,
        })
    }

    /// 我推荐的账户（分页，倒序）
    pub async fn list_referrals(
        &self,
        account_id: &str,
        params: &PaginationParams,
    ) -> AppResult<ReferralPageResponse> {
        let account = self.find(account_id).await?;

        let base_query = accounts::Entity::find()
            .filter(accounts::Column::ReferredBy.eq(account.referral_code.as_str()));

        let total = base_query.clone().count(&self.pool).await?;

        let models = base_query
            .order_by_desc(accounts::Column::CreatedAt)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items: Vec<ReferralEntry> = models.into_iter().map(ReferralEntry::from).collect();

        Ok(PaginatedResponse::new(items, params, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReferralConfig, ReferralMilestone};
    use crate::entities::{ClaimStatus, claim_entity as claims};
    use crate::services::test_support::*;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            display_name: format!("{id} display"),
            avatar: None,
            in_guild: true,
        }
    }

    fn service(db: &DatabaseConnection) -> AccountService {
        let referral = ReferralService::new(ReferralConfig {
            code_prefix: "PR-".to_string(),
            max_referrals_per_ip: 3,
            milestones: vec![ReferralMilestone {
                invite_threshold: 2,
                reward_id: "duo".to_string(),
                reward_name: "Duo Pack".to_string(),
            }],
        });
        AccountService::new(db.clone(), referral)
    }

    fn with_code(code: &str) -> RegisterRequest {
        RegisterRequest {
            referral_code: Some(code.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_creates_account_with_zero_tickets() {
        let db = setup_test_db().await;
        let svc = service(&db);

        let resp = svc
            .register(&identity("alice"), RegisterRequest::default(), Some("10.0.0.1"))
            .await
            .unwrap();
        assert!(resp.referral_code.starts_with("PR-"));

        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.ticket_count, 0);
        assert_eq!(alice.invite_count, 0);
        assert_eq!(alice.referral_code, resp.referral_code);
        assert_eq!(alice.referred_by, None);
        assert_eq!(alice.registration_ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_register_twice_is_rejected() {
        let db = setup_test_db().await;
        let svc = service(&db);

        svc.register(&identity("alice"), RegisterRequest::default(), None)
            .await
            .unwrap();
        let err = svc
            .register(&identity("alice"), RegisterRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_register_requires_guild_membership() {
        let db = setup_test_db().await;
        let svc = service(&db);
        let mut outsider = identity("eve");
        outsider.in_guild = false;

        let err = svc
            .register(&outsider, RegisterRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(!svc.exists("eve").await.unwrap());
    }

    #[tokio::test]
    async fn test_referral_credits_referrer_and_awards_milestone() {
        let db = setup_test_db().await;
        let svc = service(&db);
        seed_account(&db, "alice", "PR-ALICE1", 0).await;

        svc.register(&identity("bob"), with_code("pr-alice1"), Some("10.0.0.1"))
            .await
            .unwrap();
        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.invite_count, 1);
        assert_eq!(alice.ticket_count, 1);
        assert_eq!(
            find_account(&db, "bob").await.referred_by.as_deref(),
            Some("PR-ALICE1")
        );

        svc.register(&identity("carol"), with_code("PR-ALICE1"), Some("10.0.0.2"))
            .await
            .unwrap();
        let pending = claims::Entity::find()
            .filter(claims::Column::AccountId.eq("alice"))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reward_id, "duo");
        assert_eq!(pending[0].status, ClaimStatus::Pending);
    }

    #[tokio::test]
    async fn test_self_referral_is_never_attributed() {
        let db = setup_test_db().await;
        let svc = service(&db);

        svc.register_with_code(
            &identity("alice"),
            Some("PR-SELF01"),
            Some("10.0.0.1"),
            "PR-SELF01".to_string(),
        )
        .await
        .unwrap();

        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.referred_by, None);
        assert_eq!(alice.invite_count, 0);
        assert_eq!(alice.ticket_count, 0);
    }

    #[tokio::test]
    async fn test_fourth_referral_from_same_ip_is_dropped() {
        let db = setup_test_db().await;
        let svc = service(&db);
        seed_account(&db, "alice", "PR-ALICE1", 0).await;

        for id in ["u1", "u2", "u3", "u4"] {
            svc.register(&identity(id), with_code("PR-ALICE1"), Some("192.168.1.9"))
                .await
                .unwrap();
        }

        // 第四个账户照常创建，只是不计推荐
        let u4 = find_account(&db, "u4").await;
        assert_eq!(u4.referred_by, None);
        assert_eq!(find_account(&db, "u3").await.referred_by.as_deref(), Some("PR-ALICE1"));
        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.invite_count, 3);
        assert_eq!(alice.ticket_count, 3);

        // 其它 IP 不受影响
        svc.register(&identity("u5"), with_code("PR-ALICE1"), Some("192.168.1.10"))
            .await
            .unwrap();
        assert_eq!(find_account(&db, "alice").await.invite_count, 4);
    }

    #[tokio::test]
    async fn test_unknown_referral_code_still_registers() {
        let db = setup_test_db().await;
        let svc = service(&db);

        svc.register(&identity("bob"), with_code("PR-GHOST1"), None)
            .await
            .unwrap();
        assert_eq!(find_account(&db, "bob").await.referred_by, None);
    }

    #[tokio::test]
    async fn test_malformed_referral_code_is_rejected_before_writing() {
        let db = setup_test_db().await;
        let svc = service(&db);

        let err = svc
            .register(&identity("bob"), with_code("PR ALICE;--"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(!svc.exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_racing_duplicate_insert_rolls_back_referral() {
        let db = setup_test_db().await;
        let svc = service(&db);
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        seed_account(&db, "bob", "PR-BOB001", 0).await;

        // 绕过前置检查，模拟检查与插入之间被并发请求抢先
        let err = svc
            .register_with_code(
                &identity("bob"),
                Some("PR-ALICE1"),
                Some("10.0.0.1"),
                "PR-BOB002".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyRegistered));

        let alice = find_account(&db, "alice").await;
        assert_eq!(alice.invite_count, 0);
        assert_eq!(alice.ticket_count, 0);
    }

    #[tokio::test]
    async fn test_referral_code_collision_is_transient() {
        let db = setup_test_db().await;
        let svc = service(&db);
        seed_account(&db, "alice", "PR-ALICE1", 0).await;

        let err = svc
            .register_with_code(&identity("bob"), None, None, "PR-ALICE1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transient(_)));
        assert!(err.is_retryable());
        assert!(!svc.exists("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_and_referral_list() {
        let db = setup_test_db().await;
        let svc = service(&db);
        seed_account(&db, "alice", "PR-ALICE1", 0).await;
        svc.register(&identity("bob"), with_code("PR-ALICE1"), None)
            .await
            .unwrap();

        let profile = svc.get_profile("alice").await.unwrap();
        assert_eq!(profile.account.invite_count, 1);
        assert_eq!(profile.referral.next.unwrap().reward_id, "duo");

        let page = svc
            .list_referrals("alice", &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].display_name, "bob display");

        assert!(matches!(
            svc.get_profile("nobody").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}

use crate::entities::{ClaimStatus, claim_entity as claims};
use crate::error::{AppError, AppResult};
use crate::models::{
    AcknowledgeResponse, ClaimPageResponse, ClaimQuery, ClaimResponse, PaginatedResponse,
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};

/// 单次确认的最大 id 数
pub const MAX_ACK_BATCH: usize = 500;

/// 领取队列：游戏服务器拉取 pending 奖励并批量确认
#[derive(Clone)]
pub struct ClaimService {
    pool: DatabaseConnection,
}

impl ClaimService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 某账户全部 pending 奖励（按创建顺序）
    pub async fn list_pending(&self, account_id: &str) -> AppResult<Vec<ClaimResponse>> {
        let list = claims::Entity::find()
            .filter(claims::Column::AccountId.eq(account_id))
            .filter(claims::Column::Status.eq(ClaimStatus::Pending))
            .order_by_asc(claims::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 批量确认: Pending -> Claimed 并写入 claimed_at
    ///
    /// 不存在或已领取的 id 直接忽略，重复确认不会报错也不会重复处理。
    /// 单条 UPDATE ... WHERE status = 'pending'，状态转换只会发生一次。
    pub async fn acknowledge(&self, claim_ids: &[i64]) -> AppResult<AcknowledgeResponse> {
        if claim_ids.len() > MAX_ACK_BATCH {
            return Err(AppError::ValidationError(format!(
                "At most {MAX_ACK_BATCH} claim ids per batch"
            )));
        }

        let mut ids = claim_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(AcknowledgeResponse { acknowledged: 0 });
        }

        let result = claims::Entity::update_many()
            .set(claims::ActiveModel {
                status: Set(ClaimStatus::Claimed),
                claimed_at: Set(Some(Utc::now())),
                ..Default::default()
            })
            .filter(claims::Column::Id.is_in(ids.clone()))
            .filter(claims::Column::Status.eq(ClaimStatus::Pending))
            .exec(&self.pool)
            .await?;

        log::info!(
            "Claims acknowledged: {} of {} requested",
            result.rows_affected,
            ids.len()
        );

        Ok(AcknowledgeResponse {
            acknowledged: result.rows_affected,
        })
    }

    /// 用户查看自己的奖励
    pub async fn list_for_account(
        &self,
        account_id: &str,
        query: &ClaimQuery,
    ) -> AppResult<ClaimPageResponse> {
        let base_query = claims::Entity::find().filter(claims::Column::AccountId.eq(account_id));
        self.paginate(base_query, query).await
    }

    /// 管理后台浏览全部领取记录
    pub async fn list_all(&self, query: &ClaimQuery) -> AppResult<ClaimPageResponse> {
        self.paginate(claims::Entity::find(), query).await
    }

    async fn paginate(
        &self,
        mut base_query: Select<claims::Entity>,
        query: &ClaimQuery,
    ) -> AppResult<ClaimPageResponse> {
        if let Some(status) = query.status {
            base_query = base_query.filter(claims::Column::Status.eq(status));
        }
        let params = query.pagination();

        let total = base_query.clone().count(&self.pool).await?;

        let models = base_query
            .order_by_desc(claims::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;
        let items: Vec<ClaimResponse> = models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }
}

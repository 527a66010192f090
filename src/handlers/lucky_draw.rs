use crate::models::*;
use crate::services::LuckyDrawService;
use crate::utils::{Identity, RateLimiter};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/lucky-draw/rewards",
    tag = "lucky_draw",
    responses(
        (status = 200, description = "获取奖品列表成功", body = [RewardResponse])
    )
)]
/// 奖品配置与概率（公开）
pub async fn get_rewards(service: web::Data<LuckyDrawService>) -> Result<HttpResponse> {
    let list = service.list_rewards();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list })))
}

#[utoipa::path(
    post,
    path = "/lucky-draw/spin",
    tag = "lucky_draw",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽奖成功", body = SpinResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未预约"),
        (status = 409, description = "抽奖券不足"),
        (status = 429, description = "请求过于频繁"),
        (status = 503, description = "暂时性故障，可重试")
    )
)]
/// 进行一次抽奖:
/// 1. 锁定账户并检查抽奖券
/// 2. 按权重选择奖品
/// 3. 扣券、写抽奖记录与待领取奖励
pub async fn spin(
    service: web::Data<LuckyDrawService>,
    limiter: web::Data<dyn RateLimiter>,
    identity: Identity,
) -> Result<HttpResponse> {
    if let Err(e) = limiter.check(&format!("spin:{}", identity.id)) {
        return Ok(e.error_response());
    }

    match service.spin(&identity.id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lucky-draw/history",
    tag = "lucky_draw",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取抽奖记录成功", body = PaginatedResponse<DrawRecordResponse>),
        (status = 401, description = "未授权")
    )
)]
/// 分页获取抽奖记录（倒序）
pub async fn get_history(
    service: web::Data<LuckyDrawService>,
    identity: Identity,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match service.history(&identity.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lucky-draw/recent",
    tag = "lucky_draw",
    responses(
        (status = 200, description = "最近中奖（读取失败时为空列表）", body = [RecentWinResponse])
    )
)]
/// 最近中奖播报（公开）
pub async fn get_recent(service: web::Data<LuckyDrawService>) -> Result<HttpResponse> {
    let list = service.recent_wins().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list })))
}

/// 路由配置
pub fn lucky_draw_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lucky-draw")
            .route("/rewards", web::get().to(get_rewards))
            .route("/spin", web::post().to(spin))
            .route("/history", web::get().to(get_history))
            .route("/recent", web::get().to(get_recent)),
    );
}

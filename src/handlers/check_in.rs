use crate::services::CheckInService;
use crate::utils::{Identity, RateLimiter};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/check-in",
    tag = "check_in",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取签到状态成功", body = CheckInStatusResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未预约")
    )
)]
/// 今日是否已签到，以及下一次重置时间
pub async fn get_status(
    service: web::Data<CheckInService>,
    identity: Identity,
) -> Result<HttpResponse> {
    match service.status(&identity.id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/check-in",
    tag = "check_in",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "签到成功，获得 1 张抽奖券", body = CheckInResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未预约"),
        (status = 409, description = "今日已签到"),
        (status = 429, description = "请求过于频繁"),
        (status = 503, description = "暂时性故障，可重试")
    )
)]
/// 每日签到（按参考时区的日历日）
pub async fn check_in(
    service: web::Data<CheckInService>,
    limiter: web::Data<dyn RateLimiter>,
    identity: Identity,
) -> Result<HttpResponse> {
    if let Err(e) = limiter.check(&format!("check-in:{}", identity.id)) {
        return Ok(e.error_response());
    }

    match service.check_in(&identity.id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn check_in_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/check-in")
            .route(web::get().to(get_status))
            .route(web::post().to(check_in)),
    );
}

use crate::config::ServerConfig;
use crate::handlers::client_ip;
use crate::models::*;
use crate::services::AccountService;
use crate::utils::{Identity, RateLimiter};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/account/register",
    tag = "account",
    request_body = RegisterRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "预约成功，返回自己的推荐码", body = RegisterResponse),
        (status = 400, description = "推荐码格式错误"),
        (status = 401, description = "未授权"),
        (status = 403, description = "未加入 Discord 服务器"),
        (status = 409, description = "已经预约过"),
        (status = 429, description = "请求过于频繁"),
        (status = 503, description = "暂时性故障，可重试")
    )
)]
/// 预约注册（可携带推荐码）
/// 推荐码不存在、推荐自己、同一 IP 推荐次数超限时，账户照常创建但不计推荐
pub async fn register(
    service: web::Data<AccountService>,
    limiter: web::Data<dyn RateLimiter>,
    server: web::Data<ServerConfig>,
    identity: Identity,
    req: HttpRequest,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let ip = client_ip(&req, &server.trusted_proxies);
    let key = format!("register:{}", ip.as_deref().unwrap_or(&identity.id));
    if let Err(e) = limiter.check(&key) {
        return Ok(e.error_response());
    }

    match service
        .register(&identity, body.into_inner(), ip.as_deref())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/account/me",
    tag = "account",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取个人资料成功", body = ProfileResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未预约")
    )
)]
/// 个人资料：抽奖券、邀请数、推荐码、下一个推荐里程碑
pub async fn get_profile(
    service: web::Data<AccountService>,
    identity: Identity,
) -> Result<HttpResponse> {
    match service.get_profile(&identity.id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/account/referrals",
    tag = "account",
    params(
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取推荐列表成功", body = PaginatedResponse<ReferralEntry>),
        (status = 401, description = "未授权"),
        (status = 404, description = "尚未预约")
    )
)]
/// 我推荐的账户（倒序）
pub async fn get_referrals(
    service: web::Data<AccountService>,
    identity: Identity,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    match service.list_referrals(&identity.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn account_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account")
            .route("/register", web::post().to(register))
            .route("/me", web::get().to(get_profile))
            .route("/referrals", web::get().to(get_referrals)),
    );
}

use crate::config::GameConfig;
use crate::error::AppError;
use crate::models::*;
use crate::services::ClaimService;
use crate::utils::verify_shared_secret;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

pub const GAME_SECRET_HEADER: &str = "X-Game-Secret";

/// 校验游戏服务器密钥（在访问数据库之前）
fn authorize(req: &HttpRequest, config: &GameConfig) -> Result<(), AppError> {
    let provided = req
        .headers()
        .get(GAME_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if verify_shared_secret(&config.claim_secret, provided) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Invalid game secret".to_string()))
    }
}

#[utoipa::path(
    get,
    path = "/game/claims/{account_id}",
    tag = "game",
    params(
        ("account_id" = String, Path, description = "Discord 用户 ID"),
        ("X-Game-Secret" = String, Header, description = "游戏服务器共享密钥")
    ),
    responses(
        (status = 200, description = "待发放奖励", body = [ClaimResponse]),
        (status = 403, description = "密钥错误")
    )
)]
/// 游戏服务器拉取某账户的 pending 奖励
pub async fn list_pending(
    service: web::Data<ClaimService>,
    config: web::Data<GameConfig>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(e) = authorize(&req, &config) {
        return Ok(e.error_response());
    }

    match service.list_pending(&path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/game/claims/ack",
    tag = "game",
    request_body = AcknowledgeRequest,
    params(
        ("X-Game-Secret" = String, Header, description = "游戏服务器共享密钥")
    ),
    responses(
        (status = 200, description = "确认成功（已领取/不存在的 id 忽略）", body = AcknowledgeResponse),
        (status = 400, description = "批量过大"),
        (status = 403, description = "密钥错误")
    )
)]
/// 游戏服务器发放完成后批量确认，可安全重试
pub async fn acknowledge(
    service: web::Data<ClaimService>,
    config: web::Data<GameConfig>,
    req: HttpRequest,
    body: web::Json<AcknowledgeRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = authorize(&req, &config) {
        return Ok(e.error_response());
    }

    match service.acknowledge(&body.claim_ids).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn game_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/game")
            .route("/claims/ack", web::post().to(acknowledge))
            .route("/claims/{account_id}", web::get().to(list_pending)),
    );
}

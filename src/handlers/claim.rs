use crate::models::*;
use crate::services::ClaimService;
use crate::utils::Identity;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/claims",
    tag = "claims",
    params(
        ("status" = Option<String>, Query, description = "pending / claimed"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取奖励列表成功", body = PaginatedResponse<ClaimResponse>),
        (status = 401, description = "未授权")
    )
)]
/// 我的奖励（待游戏内发放 / 已发放）
pub async fn get_my_claims(
    service: web::Data<ClaimService>,
    identity: Identity,
    query: web::Query<ClaimQuery>,
) -> Result<HttpResponse> {
    match service.list_for_account(&identity.id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn claim_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/claims", web::get().to(get_my_claims));
}

use crate::config::AdminConfig;
use crate::error::AppError;
use crate::models::*;
use crate::services::{AdminService, ClaimService};
use crate::utils::Identity;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// 管理员 = admin.discord_ids 中的身份
fn require_admin(identity: &Identity, config: &AdminConfig) -> Result<(), AppError> {
    if config.is_admin(&identity.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "统计数据", body = AdminStatsResponse),
        (status = 401, description = "未授权"),
        (status = 403, description = "非管理员")
    )
)]
pub async fn get_stats(
    service: web::Data<AdminService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service.stats().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/accounts",
    tag = "admin",
    params(
        ("search" = Option<String>, Query, description = "按 id / 昵称 / 推荐码搜索"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "账户列表", body = PaginatedResponse<AccountResponse>),
        (status = 403, description = "非管理员")
    )
)]
pub async fn list_accounts(
    service: web::Data<AdminService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
    query: web::Query<AccountQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service.list_accounts(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/accounts/{id}/tickets",
    tag = "admin",
    params(
        ("id" = String, Path, description = "账户 ID")
    ),
    request_body = AdjustTicketsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "调整成功", body = AccountResponse),
        (status = 400, description = "调整后为负数"),
        (status = 403, description = "非管理员"),
        (status = 404, description = "账户不存在")
    )
)]
/// 人工调整抽奖券
pub async fn adjust_tickets(
    service: web::Data<AdminService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<AdjustTicketsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service
        .adjust_tickets(&identity.id, &path.into_inner(), body.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/accounts/{id}/invites",
    tag = "admin",
    params(
        ("id" = String, Path, description = "账户 ID")
    ),
    request_body = SetInviteCountRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "修改成功", body = AccountResponse),
        (status = 400, description = "邀请数为负"),
        (status = 403, description = "非管理员"),
        (status = 404, description = "账户不存在")
    )
)]
/// 人工修正邀请数（不重新发放里程碑）
pub async fn set_invite_count(
    service: web::Data<AdminService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<SetInviteCountRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service
        .set_invite_count(&identity.id, &path.into_inner(), body.into_inner())
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/accounts/{id}/transactions",
    tag = "admin",
    params(
        ("id" = String, Path, description = "账户 ID"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "账户流水", body = PaginatedResponse<TransactionLogResponse>),
        (status = 403, description = "非管理员")
    )
)]
pub async fn get_transactions(
    service: web::Data<AdminService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
    path: web::Path<String>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service.transactions(&path.into_inner(), &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/claims",
    tag = "admin",
    params(
        ("status" = Option<String>, Query, description = "pending / claimed"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "领取队列", body = PaginatedResponse<ClaimResponse>),
        (status = 403, description = "非管理员")
    )
)]
pub async fn list_claims(
    service: web::Data<ClaimService>,
    config: web::Data<AdminConfig>,
    identity: Identity,
    query: web::Query<ClaimQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&identity, &config) {
        return Ok(e.error_response());
    }

    match service.list_all(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": page }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/stats", web::get().to(get_stats))
            .route("/accounts", web::get().to(list_accounts))
            .route("/accounts/{id}/tickets", web::post().to(adjust_tickets))
            .route("/accounts/{id}/invites", web::post().to(set_invite_count))
            .route("/accounts/{id}/transactions", web::get().to(get_transactions))
            .route("/claims", web::get().to(list_claims)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CheckInService;
    use crate::services::test_support::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpMessage, test};

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            display_name: id.to_string(),
            avatar: None,
            in_guild: true,
        }
    }

    #[actix_web::test]
    async fn test_admin_routes_require_allow_list() {
        let db = setup_test_db().await;
        seed_account(&db, "alice", "PR-ALICE1", 1).await;
        let check_in = CheckInService::new(db.clone(), 0).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AdminService::new(db.clone(), check_in)))
                .app_data(web::Data::new(ClaimService::new(db.clone())))
                .app_data(web::Data::new(AdminConfig {
                    discord_ids: vec!["root".to_string()],
                }))
                .configure(admin_config),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/stats").to_request();
        req.extensions_mut().insert(identity("alice"));
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/admin/accounts/alice/tickets")
            .set_json(json!({ "delta": 4, "reason": "compensation" }))
            .to_request();
        req.extensions_mut().insert(identity("root"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["ticket_count"], 5);

        let req = test::TestRequest::get().uri("/admin/stats").to_request();
        req.extensions_mut().insert(identity("root"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total_accounts"], 1);
        assert_eq!(body["data"]["outstanding_tickets"], 5);
    }
}

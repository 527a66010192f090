use crate::services::StatsService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/stats/overview",
    tag = "stats",
    responses(
        (status = 200, description = "预约人数与全服里程碑", body = OverviewResponse)
    )
)]
pub async fn get_overview(service: web::Data<StatsService>) -> Result<HttpResponse> {
    match service.overview().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn stats_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/stats").route("/overview", web::get().to(get_overview)));
}

use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::RarityTier;
use crate::entities::{ClaimSource, ClaimStatus, TransactionAction};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::account::register,
        handlers::account::get_profile,
        handlers::account::get_referrals,
        handlers::check_in::get_status,
        handlers::check_in::check_in,
        handlers::lucky_draw::get_rewards,
        handlers::lucky_draw::spin,
        handlers::lucky_draw::get_history,
        handlers::lucky_draw::get_recent,
        handlers::claim::get_my_claims,
        handlers::game::list_pending,
        handlers::game::acknowledge,
        handlers::stats::get_overview,
        handlers::admin::get_stats,
        handlers::admin::list_accounts,
        handlers::admin::adjust_tickets,
        handlers::admin::set_invite_count,
        handlers::admin::get_transactions,
        handlers::admin::list_claims,
    ),
    components(
        schemas(
            RegisterRequest,
            RegisterResponse,
            AccountResponse,
            MilestoneResponse,
            ReferralProgress,
            ProfileResponse,
            ReferralEntry,
            CheckInStatusResponse,
            CheckInResponse,
            RarityTier,
            RewardResponse,
            WonReward,
            SpinResponse,
            DrawRecordResponse,
            RecentWinResponse,
            ClaimStatus,
            ClaimSource,
            ClaimResponse,
            ClaimQuery,
            AcknowledgeRequest,
            AcknowledgeResponse,
            TransactionAction,
            TransactionLogResponse,
            AdminStatsResponse,
            AccountQuery,
            AdjustTicketsRequest,
            SetInviteCountRequest,
            GlobalMilestoneResponse,
            OverviewResponse,
            PaginationParams,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "account", description = "Pre-registration and referral API"),
        (name = "check_in", description = "Daily check-in API"),
        (name = "lucky_draw", description = "Lucky draw API"),
        (name = "claims", description = "Reward claim API"),
        (name = "game", description = "Game server claim consumer API"),
        (name = "stats", description = "Public statistics API"),
        (name = "admin", description = "Admin dashboard API"),
    ),
    info(
        title = "Pre-registration Backend API",
        version = "1.0.0",
        description = "Pre-registration, referral and lucky draw REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_core_operations() {
        let doc = ApiDoc::openapi();
        for path in [
            "/account/register",
            "/check-in",
            "/lucky-draw/spin",
            "/game/claims/{account_id}",
            "/game/claims/ack",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}

use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;
use std::time::Duration;

use prereg_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::{GovernorLimiter, JwtService, RateLimiter},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration");

    if config.game.claim_secret.is_empty() {
        log::warn!("game.claim_secret is empty, the game claim API will reject every request");
    }

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);

    // 进程内限流（尽力而为，多实例之间不共享）
    let rate_limiter: Arc<dyn RateLimiter> = Arc::new(GovernorLimiter::new(
        config.rate_limit.max_requests,
        Duration::from_secs(config.rate_limit.window_secs),
    ));

    // 创建服务
    let referral_service = ReferralService::new(config.referral.clone());
    let account_service = AccountService::new(pool.clone(), referral_service);
    let check_in_service = CheckInService::new(pool.clone(), config.check_in.utc_offset_minutes)
        .expect("Invalid check-in configuration");
    let lucky_draw_service = LuckyDrawService::new(pool.clone(), config.lucky_draw.clone());
    let claim_service = ClaimService::new(pool.clone());
    let admin_service = AdminService::new(pool.clone(), check_in_service.clone());
    let stats_service = StatsService::new(pool.clone(), config.global_milestones.clone());

    tasks::spawn_all(
        rate_limiter.clone(),
        Duration::from_secs(config.rate_limit.prune_interval_secs),
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let game_config = web::Data::new(config.game.clone());
    let admin_config = web::Data::new(config.admin.clone());
    let limiter_data: web::Data<dyn RateLimiter> = web::Data::from(rate_limiter);
    let server_config = web::Data::new(config.server.clone());
    let cors_origins = config.server.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors(&cors_origins))
            .wrap(Logger::default())
            .app_data(web::Data::new(account_service.clone()))
            .app_data(web::Data::new(check_in_service.clone()))
            .app_data(web::Data::new(lucky_draw_service.clone()))
            .app_data(web::Data::new(claim_service.clone()))
            .app_data(web::Data::new(admin_service.clone()))
            .app_data(web::Data::new(stats_service.clone()))
            .app_data(game_config.clone())
            .app_data(admin_config.clone())
            .app_data(limiter_data.clone())
            .app_data(server_config.clone())
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::account_config)
                    .configure(handlers::check_in_config)
                    .configure(handlers::lucky_draw_config)
                    .configure(handlers::claim_config)
                    .configure(handlers::game_config)
                    .configure(handlers::stats_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

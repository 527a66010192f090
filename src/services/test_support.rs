use crate::entities::{
    account_entity as accounts, claim_entity as claims, draw_record_entity as records,
    transaction_log_entity as tx_logs,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, Schema, Set,
};

/// 单连接的 sqlite 内存库：所有事务在连接获取处串行，
/// 与 Postgres 下同一账户行锁带来的串行效果一致
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);

    let stmt = schema.create_table_from_entity(accounts::Entity);
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .unwrap();

    let stmt = schema.create_table_from_entity(records::Entity);
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .unwrap();

    let stmt = schema.create_table_from_entity(claims::Entity);
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .unwrap();

    let stmt = schema.create_table_from_entity(tx_logs::Entity);
    db.execute(db.get_database_backend().build(&stmt))
        .await
        .unwrap();

    db
}

pub async fn seed_account(
    db: &DatabaseConnection,
    id: &str,
    referral_code: &str,
    tickets: i64,
) -> accounts::Model {
    accounts::ActiveModel {
        id: Set(id.to_string()),
        display_name: Set(format!("{id} display")),
        avatar: Set(None),
        referral_code: Set(referral_code.to_string()),
        referred_by: Set(None),
        registration_ip: Set(None),
        invite_count: Set(0),
        ticket_count: Set(tickets),
        last_check_in: Set(None),
        group_affiliation: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn find_account(db: &DatabaseConnection, id: &str) -> accounts::Model {
    accounts::Entity::find_by_id(id.to_string())
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_accounts;
mod m20250901_000002_create_lucky_draw_history;
mod m20250901_000003_create_claim_queue;
mod m20250901_000004_create_transaction_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_accounts::Migration),
            Box::new(m20250901_000002_create_lucky_draw_history::Migration),
            Box::new(m20250901_000003_create_claim_queue::Migration),
            Box::new(m20250901_000004_create_transaction_logs::Migration),
        ]
    }
}

use sea_orm_migration::prelude::*;

/// Lucky draw history (one row per successful spin, append only)
#[derive(DeriveIden)]
enum LuckyDrawHistory {
    Table,
    Id,
    AccountId,
    RewardId,
    RewardName,
    Rarity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LuckyDrawHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LuckyDrawHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LuckyDrawHistory::AccountId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LuckyDrawHistory::RewardId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LuckyDrawHistory::RewardName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LuckyDrawHistory::Rarity)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LuckyDrawHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lucky_draw_history_account")
                            .from(LuckyDrawHistory::Table, LuckyDrawHistory::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lucky_draw_history_account")
                    .table(LuckyDrawHistory::Table)
                    .col(LuckyDrawHistory::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lucky_draw_history_created_at")
                    .table(LuckyDrawHistory::Table)
                    .col(LuckyDrawHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(LuckyDrawHistory::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

use sea_orm_migration::prelude::*;

/// Claim queue (rewards owed to an account, drained by the game server)
#[derive(DeriveIden)]
enum ClaimQueue {
    Table,
    Id,
    AccountId,
    RewardId,
    RewardName,
    Amount,
    Status,
    Source,
    CreatedAt,
    ClaimedAt,
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
                    .table(ClaimQueue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClaimQueue::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::AccountId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::RewardId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::RewardName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::Amount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    // pending -> claimed
                    .col(
                        ColumnDef::new(ClaimQueue::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(ClaimQueue::ClaimedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claim_queue_account")
                            .from(ClaimQueue::Table, ClaimQueue::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 游戏服务器轮询 pending 列表
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_claim_queue_account_status")
                    .table(ClaimQueue::Table)
                    .col(ClaimQueue::AccountId)
                    .col(ClaimQueue::Status)
                    .to_owned(),
            )
            .await?;

        // 里程碑奖励查重 (account_id, reward_id)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_claim_queue_account_reward")
                    .table(ClaimQueue::Table)
                    .col(ClaimQueue::AccountId)
                    .col(ClaimQueue::RewardId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(ClaimQueue::Table).to_owned())
            .await?;
        Ok(())
    }
}

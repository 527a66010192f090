use sea_orm_migration::prelude::*;

/// Transaction logs (audit trail of ticket-affecting actions)
#[derive(DeriveIden)]
enum TransactionLogs {
    Table,
    Id,
    AccountId,
    Action,
    AmountDelta,
    Details,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TransactionLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionLogs::AccountId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionLogs::Action)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransactionLogs::AmountDelta)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionLogs::Details).text().null())
                    .col(
                        ColumnDef::new(TransactionLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_transaction_logs_account")
                    .table(TransactionLogs::Table)
                    .col(TransactionLogs::AccountId)
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
                    .table(TransactionLogs::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

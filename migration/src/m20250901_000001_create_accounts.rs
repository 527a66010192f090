use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

/// Accounts (one row per Discord identity)
#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    DisplayName,
    Avatar,
    ReferralCode,
    ReferredBy,
    RegistrationIp,
    InviteCount,
    TicketCount,
    LastCheckIn,
    GroupAffiliation,
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
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::DisplayName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::Avatar).string_len(512).null())
                    .col(
                        ColumnDef::new(Accounts::ReferralCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::ReferredBy).string_len(32).null())
                    .col(
                        ColumnDef::new(Accounts::RegistrationIp)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::InviteCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::TicketCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::LastCheckIn).date().null())
                    .col(
                        ColumnDef::new(Accounts::GroupAffiliation)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // 推荐码唯一：生成时的查重只是建议，这里才是最终保证
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_referral_code_unique")
                    .table(Accounts::Table)
                    .col(Accounts::ReferralCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_referred_by")
                    .table(Accounts::Table)
                    .col(Accounts::ReferredBy)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_accounts_registration_ip")
                    .table(Accounts::Table)
                    .col(Accounts::RegistrationIp)
                    .to_owned(),
            )
            .await?;

        let conn = manager.get_connection();
        let checks = r#"
ALTER TABLE accounts
    ADD CONSTRAINT chk_accounts_ticket_count_non_negative CHECK (ticket_count >= 0),
    ADD CONSTRAINT chk_accounts_invite_count_non_negative CHECK (invite_count >= 0),
    ADD CONSTRAINT chk_accounts_no_self_referral CHECK (referred_by IS NULL OR referred_by <> referral_code);
"#;
        conn.execute(Statement::from_string(
            manager.get_database_backend(),
            checks.to_string(),
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

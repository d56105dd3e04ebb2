use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WithdrawalRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WithdrawalRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::AmountPaise)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::PayoutId)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WithdrawalRequests::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Admin listing scans pending rows in insertion order
        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawal_status_id")
                    .table(WithdrawalRequests::Table)
                    .col(WithdrawalRequests::Status)
                    .col(WithdrawalRequests::Id)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawal_user")
                    .table(WithdrawalRequests::Table)
                    .col(WithdrawalRequests::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WithdrawalRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WithdrawalRequests {
    Table,
    Id,
    UserId,
    AmountPaise,
    PayoutId,
    Status,
    CreatedAt,
    ProcessedAt,
}

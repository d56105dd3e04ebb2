use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The Telegram user id is the key, so a second /start cannot create a duplicate row.
        manager
            .create_table(
                Table::create()
                    .table(BotUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BotUsers::TgId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BotUsers::BalancePaise)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BotUsers::CompletedLinks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(BotUsers::PayoutId).string_len(256).null())
                    .col(
                        ColumnDef::new(BotUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BotUsers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BotUsers {
    Table,
    TgId,
    BalancePaise,
    CompletedLinks,
    PayoutId,
    CreatedAt,
}

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
                    .table(EarningLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EarningLinks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EarningLinks::UserId).big_integer().not_null())
                    .col(ColumnDef::new(EarningLinks::Url).string_len(512).not_null())
                    .col(ColumnDef::new(EarningLinks::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(EarningLinks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_earning_links_user")
                    .table(EarningLinks::Table)
                    .col(EarningLinks::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EarningLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EarningLinks {
    Table,
    Id,
    UserId,
    Url,
    Status,
    CreatedAt,
}

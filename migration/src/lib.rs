pub use sea_orm_migration::prelude::*;

mod m20250614_000001_create_bot_users;
mod m20250614_000002_create_earning_links;
mod m20250614_000003_create_withdrawal_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250614_000001_create_bot_users::Migration),
            Box::new(m20250614_000002_create_earning_links::Migration),
            Box::new(m20250614_000003_create_withdrawal_requests::Migration),
        ]
    }
}

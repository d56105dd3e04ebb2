//! Persistent store for bot users, generated links and withdrawal requests.
//!
//! Every operation touches a single row and is atomic on its own. The one
//! multi-row flow, withdrawal submission, runs inside a transaction and
//! resets the balance only if it still equals the amount being withdrawn.

use std::time::Duration;

use anyhow::Context;
use migration::MigratorTrait;
use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::domain::{
    Amount, LinkStatus, MAX_PAYOUT_ID_LEN, WithdrawalId, WithdrawalStatus, fixed_now,
};
use crate::entities::{bot_user, earning_link, withdrawal_request};
use crate::models::account::UserAccount;
use crate::models::withdrawal::WithdrawalRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("user {user_id} not found")]
    UserNotFound { user_id: i64 },
    #[error("withdrawal request {id} not found or not pending")]
    WithdrawalNotPending { id: WithdrawalId },
    #[error("balance of user {user_id} changed while submitting a withdrawal")]
    BalanceChanged { user_id: i64 },
    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct Store {
    database: DatabaseConnection,
}

impl Store {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug)
            .acquire_timeout(Duration::from_secs(10));

        if let Some(min) = config.min_connections {
            options.min_connections(min);
        }

        assert!(
            config.max_connections >= config.min_connections.unwrap_or(1),
            "Max connections must be >= min connections"
        );

        let database = Database::connect(options)
            .await
            .context("Failed to connect to the database")?;
        info!("Connected to the database");
        Ok(Self { database })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        migration::Migrator::up(&self.database, None)
            .await
            .context("Database migrations failed")
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.database
            .clone()
            .close()
            .await
            .context("Failed to close the database pool")?;
        info!("Database connection closed");
        Ok(())
    }

    /// Inserts a fresh user unless one exists. Returns `true` when a row was created.
    pub async fn upsert_new_user(&self, user_id: i64) -> StoreResult<bool> {
        let model = bot_user::ActiveModel {
            tg_id: Set(user_id),
            balance_paise: Set(0),
            completed_links: Set(0),
            payout_id: Set(None),
            created_at: Set(fixed_now()),
        };

        let inserted = bot_user::Entity::insert(model)
            .on_conflict(
                OnConflict::column(bot_user::Column::TgId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        assert!(inserted <= 1, "Single-row insert affected several rows");
        Ok(inserted == 1)
    }

    pub async fn get_user(&self, user_id: i64) -> StoreResult<Option<UserAccount>> {
        let model = bot_user::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?;
        model
            .map(|model| {
                UserAccount::try_from(model).map_err(|err| StoreError::Corrupt(err.to_string()))
            })
            .transpose()
    }

    /// Adds `amount` to the balance and counts one more completed link.
    pub async fn credit_user(&self, user_id: i64, amount: Amount) -> StoreResult<()> {
        assert!(amount > Amount::ZERO, "Credit amount must be positive");
        let result = bot_user::Entity::update_many()
            .col_expr(
                bot_user::Column::BalancePaise,
                Expr::col(bot_user::Column::BalancePaise).add(amount.paise()),
            )
            .col_expr(
                bot_user::Column::CompletedLinks,
                Expr::col(bot_user::Column::CompletedLinks).add(1_i64),
            )
            .filter(bot_user::Column::TgId.eq(user_id))
            .exec(&self.database)
            .await?;
        expect_one_user(result.rows_affected, user_id)
    }

    pub async fn record_link(
        &self,
        user_id: i64,
        url: &str,
        status: LinkStatus,
    ) -> StoreResult<i64> {
        assert!(!url.is_empty(), "Link URL cannot be empty");
        let model = earning_link::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            url: Set(url.to_string()),
            status: Set(status.as_str().to_string()),
            created_at: Set(fixed_now()),
        };
        let inserted = model.insert(&self.database).await?;
        debug!(user_id, link_id = inserted.id, "Recorded earning link");
        Ok(inserted.id)
    }

    // Single-step forms of what `submit_withdrawal` does in one transaction.

    #[cfg(test)]
    pub async fn set_payout_id(&self, user_id: i64, payout_id: &str) -> StoreResult<()> {
        set_payout_id_on(&self.database, user_id, payout_id).await
    }

    #[cfg(test)]
    pub async fn create_withdrawal(
        &self,
        user_id: i64,
        amount: Amount,
        payout_id: &str,
    ) -> StoreResult<WithdrawalId> {
        create_withdrawal_on(&self.database, user_id, amount, payout_id).await
    }

    /// Zeroes balance and link count together.
    #[cfg(test)]
    pub async fn reset_user(&self, user_id: i64) -> StoreResult<()> {
        let affected = reset_user_on(&self.database, user_id, None).await?;
        expect_one_user(affected, user_id)
    }

    /// Records the payout id, files a pending request for `expected_balance` and
    /// zeroes the account, all or nothing.
    ///
    /// Fails with [`StoreError::BalanceChanged`] when the stored balance no longer
    /// equals `expected_balance`, which happens if another credit or withdrawal
    /// landed after the caller read the account.
    pub async fn submit_withdrawal(
        &self,
        user_id: i64,
        expected_balance: Amount,
        payout_id: &str,
    ) -> StoreResult<WithdrawalId> {
        assert!(
            expected_balance > Amount::ZERO,
            "Withdrawal amount must be positive"
        );
        let txn = self.database.begin().await?;
        let request_id =
            match submit_withdrawal_on(&txn, user_id, expected_balance, payout_id).await {
                Ok(request_id) => request_id,
                Err(err) => {
                    txn.rollback().await?;
                    return Err(err);
                }
            };

        txn.commit().await?;
        info!(
            user_id,
            request_id = request_id.get(),
            amount = %expected_balance,
            "Withdrawal submitted"
        );
        Ok(request_id)
    }

    /// Pending requests, oldest first.
    pub async fn list_pending_withdrawals(&self) -> StoreResult<Vec<WithdrawalRecord>> {
        let models = withdrawal_request::Entity::find()
            .filter(withdrawal_request::Column::Status.eq(WithdrawalStatus::Pending.as_str()))
            .order_by_asc(withdrawal_request::Column::Id)
            .all(&self.database)
            .await?;

        models
            .into_iter()
            .map(|model| {
                WithdrawalRecord::try_from(model).map_err(|err| StoreError::Corrupt(err.to_string()))
            })
            .collect()
    }

    pub async fn get_pending_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> StoreResult<Option<WithdrawalRecord>> {
        let model = withdrawal_request::Entity::find_by_id(id.get())
            .filter(withdrawal_request::Column::Status.eq(WithdrawalStatus::Pending.as_str()))
            .one(&self.database)
            .await?;

        model
            .map(|model| {
                WithdrawalRecord::try_from(model).map_err(|err| StoreError::Corrupt(err.to_string()))
            })
            .transpose()
    }

    /// Moves a pending request to its final status and stamps `processed_at`.
    ///
    /// Only rows still pending match, so a request is decided at most once.
    pub async fn set_withdrawal_status(
        &self,
        id: WithdrawalId,
        status: WithdrawalStatus,
    ) -> StoreResult<()> {
        assert!(
            status != WithdrawalStatus::Pending,
            "Withdrawals cannot be moved back to pending"
        );
        let result = withdrawal_request::Entity::update_many()
            .col_expr(
                withdrawal_request::Column::Status,
                Expr::value(status.as_str()),
            )
            .col_expr(
                withdrawal_request::Column::ProcessedAt,
                Expr::value(fixed_now()),
            )
            .filter(withdrawal_request::Column::Id.eq(id.get()))
            .filter(withdrawal_request::Column::Status.eq(WithdrawalStatus::Pending.as_str()))
            .exec(&self.database)
            .await?;

        match result.rows_affected {
            0 => Err(StoreError::WithdrawalNotPending { id }),
            1 => Ok(()),
            other => Err(StoreError::Corrupt(format!(
                "withdrawal id {id} matched {other} rows"
            ))),
        }
    }
}

async fn set_payout_id_on<C>(db: &C, user_id: i64, payout_id: &str) -> StoreResult<()>
where
    C: ConnectionTrait,
{
    assert!(!payout_id.is_empty(), "Payout id cannot be empty");
    assert!(
        payout_id.chars().count() <= MAX_PAYOUT_ID_LEN,
        "Payout id exceeds column bound"
    );
    let result = bot_user::Entity::update_many()
        .col_expr(bot_user::Column::PayoutId, Expr::value(payout_id))
        .filter(bot_user::Column::TgId.eq(user_id))
        .exec(db)
        .await?;
    expect_one_user(result.rows_affected, user_id)
}

async fn create_withdrawal_on<C>(
    db: &C,
    user_id: i64,
    amount: Amount,
    payout_id: &str,
) -> StoreResult<WithdrawalId>
where
    C: ConnectionTrait,
{
    assert!(amount > Amount::ZERO, "Withdrawal amount must be positive");
    let model = withdrawal_request::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        amount_paise: Set(amount.paise()),
        payout_id: Set(payout_id.to_string()),
        status: Set(WithdrawalStatus::Pending.as_str().to_string()),
        created_at: Set(fixed_now()),
        processed_at: Set(None),
    };
    let inserted = model.insert(db).await?;
    WithdrawalId::new(inserted.id).map_err(|err| StoreError::Corrupt(err.to_string()))
}

async fn submit_withdrawal_on<C>(
    db: &C,
    user_id: i64,
    expected_balance: Amount,
    payout_id: &str,
) -> StoreResult<WithdrawalId>
where
    C: ConnectionTrait,
{
    set_payout_id_on(db, user_id, payout_id).await?;
    let request_id = create_withdrawal_on(db, user_id, expected_balance, payout_id).await?;
    if reset_user_on(db, user_id, Some(expected_balance)).await? != 1 {
        return Err(StoreError::BalanceChanged { user_id });
    }
    Ok(request_id)
}

/// Returns the number of rows reset. With `expected` set, only a row whose
/// balance still equals it is touched.
async fn reset_user_on<C>(db: &C, user_id: i64, expected: Option<Amount>) -> StoreResult<u64>
where
    C: ConnectionTrait,
{
    let mut update = bot_user::Entity::update_many()
        .col_expr(bot_user::Column::BalancePaise, Expr::value(0_i64))
        .col_expr(bot_user::Column::CompletedLinks, Expr::value(0_i64))
        .filter(bot_user::Column::TgId.eq(user_id));
    if let Some(balance) = expected {
        update = update.filter(bot_user::Column::BalancePaise.eq(balance.paise()));
    }
    let result = update.exec(db).await?;
    Ok(result.rows_affected)
}

fn expect_one_user(rows_affected: u64, user_id: i64) -> StoreResult<()> {
    match rows_affected {
        0 => Err(StoreError::UserNotFound { user_id }),
        1 => Ok(()),
        other => Err(StoreError::Corrupt(format!(
            "user id {user_id} matched {other} rows"
        ))),
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> Store {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: Some(1),
    };
    let store = Store::connect(&config).await.expect("in-memory database");
    store.migrate().await.expect("migrations apply");
    store
}

#[cfg(test)]
impl Store {
    /// Runs raw SQL, e.g. to install a trigger that makes later writes fail.
    pub(crate) async fn execute_raw(&self, sql: &str) -> StoreResult<()> {
        self.database.execute_unprepared(sql).await?;
        Ok(())
    }
}

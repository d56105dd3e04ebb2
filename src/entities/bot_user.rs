//! Bot user entity: one row per Telegram account that ran /start.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bot_users")]
pub struct Model {
    /// Telegram user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub tg_id: i64,
    /// Earned balance in paise
    pub balance_paise: i64,
    pub completed_links: i64,
    /// UPI id given with the last withdrawal
    #[sea_orm(column_type = "String(StringLen::N(256))", nullable)]
    pub payout_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::earning_link::Entity")]
    EarningLink,
    #[sea_orm(has_many = "super::withdrawal_request::Entity")]
    WithdrawalRequest,
}

impl Related<super::earning_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EarningLink.def()
    }
}

impl Related<super::withdrawal_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

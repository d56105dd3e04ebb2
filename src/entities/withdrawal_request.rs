//! Withdrawal request entity. Rows start `pending` and are decided once by an admin.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "withdrawal_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Telegram id of the requesting user
    pub user_id: i64,
    /// Balance snapshot at submission, in paise
    pub amount_paise: i64,
    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub payout_id: String,
    /// `pending`, `approved` or `rejected`
    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub processed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bot_user::Entity",
        from = "Column::UserId",
        to = "super::bot_user::Column::TgId"
    )]
    BotUser,
}

impl Related<super::bot_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BotUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

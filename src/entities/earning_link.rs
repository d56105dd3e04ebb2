use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "earning_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(column_type = "String(StringLen::N(512))")]
    pub url: String,
    #[sea_orm(column_type = "String(StringLen::N(16))")]
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
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

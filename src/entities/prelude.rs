#![allow(unused_imports)]

pub use super::bot_user::Entity as BotUser;
pub use super::earning_link::Entity as EarningLink;
pub use super::withdrawal_request::Entity as WithdrawalRequest;

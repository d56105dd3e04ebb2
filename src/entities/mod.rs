pub mod prelude;

pub mod bot_user;
pub mod earning_link;
pub mod withdrawal_request;

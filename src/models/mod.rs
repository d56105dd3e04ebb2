pub mod account;
pub mod withdrawal;

//! Command handling: one handler per bot command.
//!
//! Handlers never return errors. Store and gateway failures are logged where
//! they happen and turned into a reply, so nothing reaches the dispatcher.

use std::sync::Arc;

use teloxide::utils::command::{BotCommands, ParseError};
use teloxide::utils::html;
use tracing::{error, warn};

use crate::config::BotConfig;
use crate::models::account::UserAccount;
use crate::notifier::Messenger;
use crate::shortener::Shortener;
use crate::store::Store;

mod account;
mod admin;
mod earning;
mod withdraw;

const START_FIRST: &str = "Please /start the bot first!";
const GENERIC_FAILURE: &str = "❌ Something went wrong on our side. Please try again later.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "register and read the tutorial.")]
    Start,
    #[command(description = "get a new earning link.")]
    GetLink,
    #[command(description = "show your balance and completed links.")]
    Balance,
    #[command(description = "request a payout: /withdraw <upi_id>", parse_with = trailing_text)]
    Withdraw(String),
    #[command(description = "review withdrawals (admins only).", parse_with = trailing_text)]
    Admin(String),
    #[command(description = "show this message.")]
    Help,
}

fn trailing_text(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Who sent a command and where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: String,
}

impl Sender {
    /// `@username` when the user has one, otherwise the first name.
    pub fn mention(&self) -> String {
        match &self.username {
            Some(username) => format!("@{username}"),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub admin_ids: Vec<i64>,
    pub target_base_url: String,
}

impl RouterSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            admin_ids: config.admin_ids().to_vec(),
            target_base_url: config.shortener.target_base_url.clone(),
        }
    }
}

pub struct CommandRouter<S, M> {
    store: Arc<Store>,
    shortener: S,
    messenger: M,
    settings: RouterSettings,
}

impl<S, M> CommandRouter<S, M>
where
    S: Shortener,
    M: Messenger,
{
    pub fn new(store: Arc<Store>, shortener: S, messenger: M, settings: RouterSettings) -> Self {
        assert!(
            !settings.target_base_url.is_empty(),
            "Earning target URL must be configured"
        );
        Self {
            store,
            shortener,
            messenger,
            settings,
        }
    }

    pub async fn dispatch(&self, sender: &Sender, command: Command) {
        match command {
            Command::Start => self.start(sender).await,
            Command::GetLink => self.get_link(sender).await,
            Command::Balance => self.balance(sender).await,
            Command::Withdraw(args) => self.withdraw(sender, &args).await,
            Command::Admin(args) => self.admin(sender, &args).await,
            Command::Help => self.help(sender).await,
        }
    }

    async fn help(&self, sender: &Sender) {
        let text = html::escape(&Command::descriptions().to_string());
        self.reply(sender, &text).await;
    }

    async fn reply(&self, sender: &Sender, text: &str) {
        if let Err(err) = self.messenger.send(sender.chat_id, text).await {
            warn!(user_id = sender.user_id, "Failed to reply: {err}");
        }
    }

    /// Loads the sender's account; replies with `missing_reply` when there is none.
    async fn require_account(&self, sender: &Sender, missing_reply: &str) -> Option<UserAccount> {
        match self.store.get_user(sender.user_id).await {
            Ok(Some(account)) => Some(account),
            Ok(None) => {
                self.reply(sender, missing_reply).await;
                None
            }
            Err(err) => {
                error!(user_id = sender.user_id, "Failed to load user: {err}");
                self.reply(sender, GENERIC_FAILURE).await;
                None
            }
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_ids.contains(&user_id)
    }

    #[cfg(test)]
    pub(crate) fn messenger(&self) -> &M {
        &self.messenger
    }

    #[cfg(test)]
    pub(crate) fn shortener(&self) -> &S {
        &self.shortener
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Store {
        &self.store
    }
}

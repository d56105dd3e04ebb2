mod commands;
mod config;
mod domain;
mod entities;
mod models;
mod notifier;
mod shortener;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, CommandRouter, RouterSettings, Sender};
use crate::config::BotConfig;
use crate::notifier::TelegramMessenger;
use crate::shortener::GpLinksClient;
use crate::store::Store;

type BotRouter = CommandRouter<GpLinksClient, TelegramMessenger>;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = BotConfig::load().context("Failed to load configuration")?;
    if config.admin_ids().is_empty() {
        warn!("ADMIN_IDS is empty; withdrawals cannot be reviewed");
    }

    let store = Store::connect(&config.database).await?;
    store.migrate().await?;
    let store = Arc::new(store);

    let shortener = GpLinksClient::new(&config.shortener)
        .context("Failed to initialize shortener client")?;
    info!(
        timeout_ms = shortener.timeout().as_millis() as u64,
        "Shortener client ready"
    );

    let bot = Bot::new(config.telegram.token.clone());
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to publish command list: {err}");
    }

    let router: Arc<BotRouter> = Arc::new(CommandRouter::new(
        Arc::clone(&store),
        shortener,
        TelegramMessenger::new(bot.clone()),
        RouterSettings::from_config(&config),
    ));

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(handle_command);

    info!(admins = config.admin_ids().len(), "Earn bot polling for updates");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, closing database");
    store.close().await
}

async fn handle_command(msg: Message, command: Command, router: Arc<BotRouter>) -> ResponseResult<()> {
    // Channel posts carry no author and are ignored.
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let sender = Sender {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
    };
    router.dispatch(&sender, command).await;
    Ok(())
}

fn init_tracing() {
    let default_filter = "info,reqwest=warn,hyper=warn,sqlx=warn";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

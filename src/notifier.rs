use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum MessengerError {
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Outbound side of the bot: delivers an HTML-formatted message to a chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError>;
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError> {
        assert!(!text.is_empty(), "Outbound message cannot be empty");
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Sends `text` to every recipient. A failed delivery is logged and skipped.
/// Returns how many recipients were reached.
pub async fn notify_all<M>(messenger: &M, recipients: &[i64], text: &str) -> usize
where
    M: Messenger + ?Sized,
{
    let mut delivered = 0;
    for &recipient in recipients {
        match messenger.send(recipient, text).await {
            Ok(()) => delivered += 1,
            Err(err) => error!(recipient, "Failed to notify {recipient}: {err}"),
        }
    }
    info!(delivered, total = recipients.len(), "Notification fan-out finished");
    delivered
}

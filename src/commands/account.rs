use teloxide::utils::html;
use tracing::{error, info};

use super::{CommandRouter, GENERIC_FAILURE, Sender};
use crate::domain::{LINK_REWARD, MIN_WITHDRAWAL};
use crate::notifier::Messenger;
use crate::shortener::Shortener;

const NOT_STARTED: &str = "You haven't started yet! Use /start to begin.";

fn welcome_text() -> String {
    let links_for_payout = MIN_WITHDRAWAL.paise() / LINK_REWARD.paise();
    format!(
        "👋 Welcome to Earn Bot! You can earn {LINK_REWARD} per completed link. \
         Complete {links_for_payout} links = {MIN_WITHDRAWAL} payout via UPI.\n\n\
         <b>Tutorial:</b>\n\
         1. Use /getlink to get a unique earning link.\n\
         2. Complete the link (you'll be redirected to a page).\n\
         3. Check your balance with /balance.\n\
         4. Once you reach {MIN_WITHDRAWAL}, use {} to request a payout.",
        html::code_inline("/withdraw <your_upi_id>")
    )
}

impl<S, M> CommandRouter<S, M>
where
    S: Shortener,
    M: Messenger,
{
    /// Registers the sender on first contact. Repeat calls only resend the welcome.
    pub(super) async fn start(&self, sender: &Sender) {
        match self.store.upsert_new_user(sender.user_id).await {
            Ok(true) => info!(user_id = sender.user_id, "New user registered"),
            Ok(false) => {}
            Err(err) => {
                error!(user_id = sender.user_id, "Failed to register user: {err}");
                self.reply(sender, GENERIC_FAILURE).await;
                return;
            }
        }
        self.reply(sender, &welcome_text()).await;
    }

    pub(super) async fn balance(&self, sender: &Sender) {
        let Some(account) = self.require_account(sender, NOT_STARTED).await else {
            return;
        };
        let text = format!(
            "💰 Your current balance: <b>{}</b>\n🔗 Completed links: <b>{}</b>",
            account.balance, account.completed_links
        );
        self.reply(sender, &text).await;
    }
}

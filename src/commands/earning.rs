use teloxide::utils::html;
use tracing::{error, info, warn};

use super::{CommandRouter, START_FIRST, Sender};
use crate::domain::{LINK_REWARD, LinkStatus};
use crate::notifier::Messenger;
use crate::shortener::Shortener;

const SHORTENER_DOWN: &str =
    "😞 Sorry, I couldn't generate an earning link at the moment. Please try again later.";
const CREDIT_FAILED: &str =
    "❌ Failed to update your balance after link generation (simulation error).";

/// Page the short link redirects to, tagged with the user and link sequence.
pub(crate) fn earning_target_url(base: &str, user_id: i64, link_seq: u64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}user={user_id}&link_seq={link_seq}")
}

impl<S, M> CommandRouter<S, M>
where
    S: Shortener,
    M: Messenger,
{
    pub(super) async fn get_link(&self, sender: &Sender) {
        let user_id = sender.user_id;
        let Some(account) = self.require_account(sender, START_FIRST).await else {
            return;
        };

        let target = earning_target_url(
            &self.settings.target_base_url,
            user_id,
            account.next_link_seq(),
        );
        let short_link = match self.shortener.shorten(&target).await {
            Ok(link) => link,
            Err(err) => {
                error!(user_id, "Failed to generate earning link: {err}");
                self.reply(sender, SHORTENER_DOWN).await;
                return;
            }
        };

        if let Err(err) = self
            .store
            .record_link(user_id, &short_link, LinkStatus::Pending)
            .await
        {
            warn!(user_id, "Failed to record earning link: {err}");
        }

        let text = format!(
            "🔗 Here is your unique earning link:\n{}\n\nComplete this link to earn {LINK_REWARD}!",
            html::code_inline(&short_link)
        );
        self.reply(sender, &text).await;
        info!(user_id, %short_link, "Issued earning link");

        // Completion is not tracked yet; the reward is credited as soon as the link is issued.
        match self.store.credit_user(user_id, LINK_REWARD).await {
            Ok(()) => {
                let text = format!(
                    "✅ Link completion simulated! {LINK_REWARD} has been added to your balance."
                );
                self.reply(sender, &text).await;
            }
            Err(err) => {
                error!(user_id, "Failed to credit link reward: {err}");
                self.reply(sender, CREDIT_FAILED).await;
            }
        }
    }
}

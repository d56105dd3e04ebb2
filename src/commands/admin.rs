use teloxide::utils::html;
use tracing::{error, info, warn};

use super::{CommandRouter, GENERIC_FAILURE, Sender};
use crate::domain::{Decision, WithdrawalId};
use crate::models::withdrawal::WithdrawalRecord;
use crate::notifier::Messenger;
use crate::shortener::Shortener;
use crate::store::StoreError;

const NOT_AUTHORIZED: &str = "🚫 You are not authorized to use this command.";
const INVALID_ID: &str = "Invalid request ID format.";
const USAGE: &str = "Unknown admin action. Use <code>/admin approve &lt;request_id&gt;</code> \
                     or <code>/admin reject &lt;request_id&gt;</code>.";

/// Telegram rejects messages over 4096 characters; leave headroom for the footer.
const MESSAGE_BUDGET: usize = 3_800;

/// What an admin asked for, parsed from the text after `/admin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    ListPending,
    Decide { decision: Decision, id: WithdrawalId },
    MissingId(Decision),
    InvalidId(String),
    Unknown(String),
}

impl AdminAction {
    pub fn parse(args: &str) -> Self {
        let mut parts = args.split_whitespace();
        let Some(action) = parts.next() else {
            return AdminAction::ListPending;
        };
        let Some(decision) = Decision::parse(action) else {
            return AdminAction::Unknown(action.to_string());
        };
        match parts.next() {
            None => AdminAction::MissingId(decision),
            Some(raw) => match raw.parse::<WithdrawalId>() {
                Ok(id) => AdminAction::Decide { decision, id },
                Err(_) => AdminAction::InvalidId(raw.to_string()),
            },
        }
    }
}

/// Renders pending requests as one or more messages, splitting between entries.
pub(crate) fn render_pending(records: &[WithdrawalRecord]) -> Vec<String> {
    const HEADER: &str = "🗓️ <b>Pending Withdrawal Requests:</b>\n\n";
    const FOOTER: &str = "To act, use <code>/admin approve &lt;request_id&gt;</code> \
                          or <code>/admin reject &lt;request_id&gt;</code>.";

    let mut messages = Vec::new();
    let mut current = String::from(HEADER);
    for record in records {
        let entry = format!(
            "• <b>Request ID:</b> <code>{}</code>\n  \
             <b>User ID:</b> <code>{}</code>\n  \
             <b>Amount:</b> {}\n  \
             <b>UPI ID:</b> {}\n  \
             <b>Requested On:</b> {}\n\n",
            record.id,
            record.user_id,
            record.amount,
            html::code_inline(&record.payout_id),
            record.created_at.format("%Y-%m-%d %H:%M"),
        );
        if current.len() + entry.len() > MESSAGE_BUDGET && current.len() > HEADER.len() {
            messages.push(std::mem::take(&mut current));
        }
        current.push_str(&entry);
    }
    current.push_str(FOOTER);
    messages.push(current);
    messages
}

impl<S, M> CommandRouter<S, M>
where
    S: Shortener,
    M: Messenger,
{
    pub(super) async fn admin(&self, sender: &Sender, args: &str) {
        if !self.is_admin(sender.user_id) {
            warn!(user_id = sender.user_id, "Unauthorized admin command attempt");
            self.reply(sender, NOT_AUTHORIZED).await;
            return;
        }

        match AdminAction::parse(args) {
            AdminAction::ListPending => self.list_pending(sender).await,
            AdminAction::Decide { decision, id } => self.decide(sender, decision, id).await,
            AdminAction::MissingId(decision) => {
                let text = format!(
                    "Please provide a request ID: <code>/admin {} &lt;request_id&gt;</code>",
                    decision.verb()
                );
                self.reply(sender, &text).await;
            }
            AdminAction::InvalidId(raw) => {
                info!(admin_id = sender.user_id, %raw, "Rejected malformed request id");
                self.reply(sender, INVALID_ID).await;
            }
            AdminAction::Unknown(_) => self.reply(sender, USAGE).await,
        }
    }

    async fn list_pending(&self, sender: &Sender) {
        let records = match self.store.list_pending_withdrawals().await {
            Ok(records) => records,
            Err(err) => {
                error!("Failed to list pending withdrawals: {err}");
                self.reply(sender, GENERIC_FAILURE).await;
                return;
            }
        };
        if records.is_empty() {
            self.reply(sender, "No pending withdrawal requests.").await;
            return;
        }
        for message in render_pending(&records) {
            self.reply(sender, &message).await;
        }
    }

    async fn decide(&self, sender: &Sender, decision: Decision, id: WithdrawalId) {
        let not_found = format!("Request ID <code>{id}</code> not found or not pending.");
        let record = match self.store.get_pending_withdrawal(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.reply(sender, &not_found).await;
                return;
            }
            Err(err) => {
                error!(request_id = id.get(), "Failed to load withdrawal: {err}");
                self.reply(sender, GENERIC_FAILURE).await;
                return;
            }
        };

        match self.store.set_withdrawal_status(id, decision.status()).await {
            Ok(()) => {}
            // Another admin decided it between the lookup and the update.
            Err(StoreError::WithdrawalNotPending { .. }) => {
                self.reply(sender, &not_found).await;
                return;
            }
            Err(err) => {
                error!(request_id = id.get(), "Failed to {} withdrawal: {err}", decision.verb());
                let text = format!("❌ Failed to {} request <code>{id}</code>.", decision.verb());
                self.reply(sender, &text).await;
                return;
            }
        }

        let past = decision.past_tense();
        info!(
            admin_id = sender.user_id,
            request_id = id.get(),
            user_id = record.user_id,
            "Withdrawal {past}"
        );
        self.reply(sender, &format!("Withdrawal request <code>{id}</code> {past}."))
            .await;

        let notice = format!(
            "📢 Your withdrawal request for {} has been <b>{past}</b> by an admin.",
            record.amount
        );
        if let Err(err) = self.messenger.send(record.user_id, &notice).await {
            error!(user_id = record.user_id, "Failed to notify user of decision: {err}");
        }
    }
}

use teloxide::utils::html;
use tracing::{error, info, warn};

use super::{CommandRouter, START_FIRST, Sender};
use crate::domain::{Amount, MAX_PAYOUT_ID_LEN, MIN_WITHDRAWAL, WithdrawalId};
use crate::notifier::{Messenger, notify_all};
use crate::shortener::Shortener;

const WITHDRAW_FAILED: &str = "❌ An error occurred while processing your withdrawal. Please try again.";

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PayoutIdError {
    Missing,
    TooLong,
}

/// Collapses the command arguments into a single payout id.
pub(crate) fn parse_payout_id(args: &str) -> Result<String, PayoutIdError> {
    let payout_id = args.split_whitespace().collect::<Vec<_>>().join(" ");
    if payout_id.is_empty() {
        return Err(PayoutIdError::Missing);
    }
    if payout_id.chars().count() > MAX_PAYOUT_ID_LEN {
        return Err(PayoutIdError::TooLong);
    }
    Ok(payout_id)
}

fn admin_alert(request_id: WithdrawalId, sender: &Sender, amount: Amount, payout_id: &str) -> String {
    format!(
        "🚨 <b>New Withdrawal Request!</b> 🚨\n\n\
         <b>Request ID:</b> <code>{request_id}</code>\n\
         <b>User ID:</b> <code>{}</code> ({})\n\
         <b>Amount:</b> {amount}\n\
         <b>UPI ID:</b> {}\n\
         <b>Status:</b> Pending\n\n\
         Use /admin to list pending requests, then \
         <code>/admin approve {request_id}</code> or <code>/admin reject {request_id}</code>.",
        sender.user_id,
        html::escape(&sender.mention()),
        html::code_inline(payout_id),
    )
}

impl<S, M> CommandRouter<S, M>
where
    S: Shortener,
    M: Messenger,
{
    pub(super) async fn withdraw(&self, sender: &Sender, args: &str) {
        let user_id = sender.user_id;
        let Some(account) = self.require_account(sender, START_FIRST).await else {
            return;
        };

        if account.balance < MIN_WITHDRAWAL {
            let text = format!(
                "You need at least {MIN_WITHDRAWAL} to withdraw. Your current balance is {}.",
                account.balance
            );
            self.reply(sender, &text).await;
            return;
        }

        let payout_id = match parse_payout_id(args) {
            Ok(payout_id) => payout_id,
            Err(PayoutIdError::Missing) => {
                let text = format!(
                    "Please provide your UPI ID after the command, e.g., {}",
                    html::code_inline("/withdraw your_upi_id@bank")
                );
                self.reply(sender, &text).await;
                return;
            }
            Err(PayoutIdError::TooLong) => {
                self.reply(sender, "Invalid UPI ID provided.").await;
                return;
            }
        };

        let amount = account.balance;
        let request_id = match self
            .store
            .submit_withdrawal(user_id, amount, &payout_id)
            .await
        {
            Ok(request_id) => request_id,
            Err(err) => {
                error!(user_id, "Failed to submit withdrawal: {err}");
                self.reply(sender, WITHDRAW_FAILED).await;
                return;
            }
        };

        let text = format!(
            "✅ Withdrawal request for {amount} to UPI ID {} has been submitted. \
             It will be reviewed by an admin shortly. Your balance has been reset.",
            html::code_inline(&payout_id)
        );
        self.reply(sender, &text).await;

        if self.settings.admin_ids.is_empty() {
            warn!(request_id = request_id.get(), "No admins configured to review withdrawal");
            return;
        }
        let alert = admin_alert(request_id, sender, amount, &payout_id);
        let delivered = notify_all(&self.messenger, &self.settings.admin_ids, &alert).await;
        info!(request_id = request_id.get(), delivered, "Admins notified of withdrawal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::domain::WithdrawalStatus;
    use crate::testing::{
        RecordingMessenger, ScriptedShortener, TestRouter, sender, test_router, test_router_with,
    };

    fn links(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("https://s.example/{i}")).collect()
    }

    async fn earn(router: &TestRouter, who: &Sender, times: usize) {
        router.dispatch(who, Command::Start).await;
        for _ in 0..times {
            router.dispatch(who, Command::GetLink).await;
        }
        router.messenger().clear();
    }

    #[test]
    fn payout_id_is_trimmed_and_bounded() {
        assert_eq!(parse_payout_id("  me@upi "), Ok("me@upi".to_string()));
        assert_eq!(parse_payout_id("a  b"), Ok("a b".to_string()));
        assert_eq!(parse_payout_id("   "), Err(PayoutIdError::Missing));
        assert_eq!(
            parse_payout_id(&"x".repeat(MAX_PAYOUT_ID_LEN + 1)),
            Err(PayoutIdError::TooLong)
        );
        assert!(parse_payout_id(&"x".repeat(MAX_PAYOUT_ID_LEN)).is_ok());
    }

    #[tokio::test]
    async fn below_minimum_is_rejected_without_changes() {
        let urls = links(1);
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let router = test_router(ScriptedShortener::succeeding(&urls), vec![100]).await;
        let who = sender(42);
        earn(&router, &who, 1).await;

        router
            .dispatch(&who, Command::Withdraw("me@upi".to_string()))
            .await;

        assert_eq!(
            router.messenger().sent_to(42),
            vec!["You need at least ₹10.00 to withdraw. Your current balance is ₹1.00.".to_string()]
        );
        assert!(router.messenger().sent_to(100).is_empty());
        let account = router.store().get_user(42).await.unwrap().expect("registered");
        assert_eq!(account.balance, Amount::from_paise(100));
        assert_eq!(account.payout_id, None);
        assert!(router.store().list_pending_withdrawals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_payout_id_prompts_for_it() {
        let urls = links(10);
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let router = test_router(ScriptedShortener::succeeding(&urls), vec![]).await;
        let who = sender(7);
        earn(&router, &who, 10).await;

        router.dispatch(&who, Command::Withdraw(String::new())).await;

        let replies = router.messenger().sent_to(7);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("Please provide your UPI ID"));
        let account = router.store().get_user(7).await.unwrap().expect("registered");
        assert_eq!(account.balance, MIN_WITHDRAWAL);
        assert!(router.store().list_pending_withdrawals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_withdrawal_resets_account_and_alerts_admins() {
        let urls = links(12);
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let router = test_router_with(
            ScriptedShortener::succeeding(&urls),
            RecordingMessenger::failing_for([200]),
            vec![100, 200, 300],
        )
        .await;
        let who = sender(42);
        earn(&router, &who, 12).await;

        router
            .dispatch(&who, Command::Withdraw("me@upi".to_string()))
            .await;

        let replies = router.messenger().sent_to(42);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("✅ Withdrawal request for ₹12.00 to UPI ID <code>me@upi</code>"));

        let account = router.store().get_user(42).await.unwrap().expect("registered");
        assert_eq!(account.balance, Amount::ZERO);
        assert_eq!(account.completed_links, 0);
        assert_eq!(account.payout_id.as_deref(), Some("me@upi"));

        let pending = router.store().list_pending_withdrawals().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_id, 42);
        assert_eq!(pending[0].amount, Amount::from_paise(1_200));
        assert_eq!(pending[0].payout_id, "me@upi");
        assert_eq!(pending[0].status, WithdrawalStatus::Pending);

        for admin in [100, 300] {
            let alerts = router.messenger().sent_to(admin);
            assert_eq!(alerts.len(), 1, "admin {admin} alerted");
            assert!(alerts[0].contains("New Withdrawal Request!"));
            assert!(alerts[0].contains(&format!("<code>{}</code>", pending[0].id)));
            assert!(alerts[0].contains("(@user42)"));
            assert!(alerts[0].contains("₹12.00"));
        }
    }

    #[tokio::test]
    async fn failed_submission_changes_nothing_and_alerts_no_one() {
        let urls = links(10);
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let router = test_router(ScriptedShortener::succeeding(&urls), vec![100]).await;
        let who = sender(42);
        earn(&router, &who, 10).await;
        router
            .store()
            .execute_raw(
                "CREATE TRIGGER freeze_payouts BEFORE INSERT ON withdrawal_requests \
                 BEGIN SELECT RAISE(ABORT, 'payouts frozen'); END;",
            )
            .await
            .unwrap();

        router
            .dispatch(&who, Command::Withdraw("me@upi".to_string()))
            .await;

        assert_eq!(router.messenger().sent_to(42), vec![WITHDRAW_FAILED.to_string()]);
        assert!(router.messenger().sent_to(100).is_empty());
        let account = router.store().get_user(42).await.unwrap().expect("registered");
        assert_eq!(account.balance, MIN_WITHDRAWAL);
        assert_eq!(account.completed_links, 10);
        assert_eq!(account.payout_id, None);
        assert!(router.store().list_pending_withdrawals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_withdrawal_sees_an_empty_balance() {
        let urls = links(10);
        let urls: Vec<&str> = urls.iter().map(String::as_str).collect();
        let router = test_router(ScriptedShortener::succeeding(&urls), vec![]).await;
        let who = sender(3);
        earn(&router, &who, 10).await;

        router.dispatch(&who, Command::Withdraw("a@upi".to_string())).await;
        router.dispatch(&who, Command::Withdraw("a@upi".to_string())).await;

        let replies = router.messenger().sent_to(3);
        assert_eq!(
            replies[1],
            "You need at least ₹10.00 to withdraw. Your current balance is ₹0.00."
        );
        assert_eq!(router.store().list_pending_withdrawals().await.unwrap().len(), 1);
    }

    #[test]
    fn admin_alert_escapes_user_supplied_text() {
        let mut who = sender(5);
        who.username = Some("<b>".to_string());
        let alert = admin_alert(
            WithdrawalId::new(9).unwrap(),
            &who,
            MIN_WITHDRAWAL,
            "x<y@upi",
        );
        assert!(alert.contains("(@&lt;b&gt;)"));
        assert!(alert.contains("<code>x&lt;y@upi</code>"));
        assert!(alert.contains("<code>/admin approve 9</code>"));
    }

    #[test]
    fn admin_alert_uses_first_name_without_handle() {
        let mut who = sender(5);
        who.username = None;
        let alert = admin_alert(WithdrawalId::new(2).unwrap(), &who, MIN_WITHDRAWAL, "a@upi");
        assert!(alert.contains("<code>5</code> (First5)"));
        assert!(!alert.contains("@First5"));
    }
}

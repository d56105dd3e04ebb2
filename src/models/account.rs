use anyhow::{Context, ensure};

use crate::domain::Amount;
use crate::entities::bot_user;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: i64,
    pub balance: Amount,
    pub completed_links: u64,
    pub payout_id: Option<String>,
}

impl UserAccount {
    /// Sequence number the next generated link will carry.
    pub fn next_link_seq(&self) -> u64 {
        self.completed_links.saturating_add(1)
    }
}

impl TryFrom<bot_user::Model> for UserAccount {
    type Error = anyhow::Error;

    fn try_from(model: bot_user::Model) -> Result<Self, Self::Error> {
        ensure!(
            model.balance_paise >= 0,
            "User {} has negative balance {}",
            model.tg_id,
            model.balance_paise
        );
        let completed_links = u64::try_from(model.completed_links).with_context(|| {
            format!(
                "User {} has negative link count {}",
                model.tg_id, model.completed_links
            )
        })?;
        Ok(Self {
            user_id: model.tg_id,
            balance: Amount::from_paise(model.balance_paise),
            completed_links,
            payout_id: model.payout_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixed_now;

    fn row(balance_paise: i64, completed_links: i64) -> bot_user::Model {
        bot_user::Model {
            tg_id: 42,
            balance_paise,
            completed_links,
            payout_id: None,
            created_at: fixed_now(),
        }
    }

    #[test]
    fn valid_row_converts() {
        let account = UserAccount::try_from(row(300, 3)).unwrap();
        assert_eq!(account.balance, Amount::from_paise(300));
        assert_eq!(account.completed_links, 3);
        assert_eq!(account.next_link_seq(), 4);
    }

    #[test]
    fn negative_values_are_rejected() {
        let err = UserAccount::try_from(row(-1, 0)).unwrap_err();
        assert!(err.to_string().contains("negative balance"));
        let err = UserAccount::try_from(row(0, -2)).unwrap_err();
        assert!(err.to_string().contains("negative link count"));
    }
}

use chrono::{DateTime, Utc};

use crate::domain::{Amount, WithdrawalId, WithdrawalStatus};
use crate::entities::withdrawal_request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRecord {
    pub id: WithdrawalId,
    pub user_id: i64,
    pub amount: Amount,
    pub payout_id: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<withdrawal_request::Model> for WithdrawalRecord {
    type Error = anyhow::Error;

    fn try_from(model: withdrawal_request::Model) -> Result<Self, Self::Error> {
        let id = WithdrawalId::new(model.id)?;
        let status = WithdrawalStatus::parse(&model.status).ok_or_else(|| {
            anyhow::anyhow!("Withdrawal {} has unknown status {}", model.id, model.status)
        })?;
        Ok(Self {
            id,
            user_id: model.user_id,
            amount: Amount::from_paise(model.amount_paise),
            payout_id: model.payout_id,
            status,
            created_at: model.created_at.with_timezone(&Utc),
            processed_at: model.processed_at.map(|ts| ts.with_timezone(&Utc)),
        })
    }
}

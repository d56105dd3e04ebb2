use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Utc};

pub const PAISE_PER_RUPEE: i64 = 100;

/// Credit for one completed link (₹1).
pub const LINK_REWARD: Amount = Amount::from_paise(100);

/// Smallest balance that may be withdrawn (₹10).
pub const MIN_WITHDRAWAL: Amount = Amount::from_paise(1_000);

pub const MAX_PAYOUT_ID_LEN: usize = 256;

const _: () = assert!(LINK_REWARD.paise() <= MIN_WITHDRAWAL.paise());

/// Money in paise. Stored as an integer so balances never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    pub const fn paise(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_rupee = PAISE_PER_RUPEE as u64;
        write!(f, "{sign}₹{}.{:02}", abs / per_rupee, abs % per_rupee)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WithdrawalIdError {
    #[error("withdrawal id cannot be empty")]
    Empty,
    #[error("withdrawal id `{0}` is not a positive integer")]
    Malformed(String),
}

/// Identifier of a withdrawal request, validated once where it enters the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WithdrawalId(i64);

impl WithdrawalId {
    pub fn new(raw: i64) -> Result<Self, WithdrawalIdError> {
        if raw <= 0 {
            return Err(WithdrawalIdError::Malformed(raw.to_string()));
        }
        Ok(Self(raw))
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl FromStr for WithdrawalId {
    type Err = WithdrawalIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(WithdrawalIdError::Empty);
        }
        // Reject signs and whitespace that i64::from_str would otherwise accept.
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WithdrawalIdError::Malformed(trimmed.to_string()));
        }
        let raw = trimmed
            .parse::<i64>()
            .map_err(|_| WithdrawalIdError::Malformed(trimmed.to_string()))?;
        Self::new(raw)
    }
}

impl fmt::Display for WithdrawalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(WithdrawalStatus::Pending),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }
}

/// Outcome an admin can give a pending withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Some(Decision::Approve),
            "reject" => Some(Decision::Reject),
            _ => None,
        }
    }

    pub const fn verb(self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    pub const fn past_tense(self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        }
    }

    pub const fn status(self) -> WithdrawalStatus {
        match self {
            Decision::Approve => WithdrawalStatus::Approved,
            Decision::Reject => WithdrawalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Pending,
}

impl LinkStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
        }
    }
}

pub fn to_fixed_offset(time: DateTime<Utc>) -> DateTime<FixedOffset> {
    let converted = time.fixed_offset();
    assert_eq!(
        converted.offset().local_minus_utc(),
        0,
        "Offset conversion failed"
    );
    assert!(converted.year() >= 1970, "Timestamp predates Unix epoch");
    converted
}

pub fn fixed_now() -> DateTime<FixedOffset> {
    to_fixed_offset(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_formats_as_rupees() {
        assert_eq!(Amount::ZERO.to_string(), "₹0.00");
        assert_eq!(LINK_REWARD.to_string(), "₹1.00");
        assert_eq!(MIN_WITHDRAWAL.to_string(), "₹10.00");
        assert_eq!(Amount::from_paise(1_234).to_string(), "₹12.34");
        assert_eq!(Amount::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Amount::from_paise(-250).to_string(), "-₹2.50");
    }

    #[test]
    fn withdrawal_id_parsing() {
        assert_eq!("42".parse::<WithdrawalId>().unwrap().get(), 42);
        assert_eq!(" 7 ".parse::<WithdrawalId>().unwrap().get(), 7);
        assert_eq!("".parse::<WithdrawalId>(), Err(WithdrawalIdError::Empty));
        assert!("0".parse::<WithdrawalId>().is_err());
        assert!("-3".parse::<WithdrawalId>().is_err());
        assert!("+3".parse::<WithdrawalId>().is_err());
        assert!("65f1c0ffee".parse::<WithdrawalId>().is_err());
        assert!("99999999999999999999".parse::<WithdrawalId>().is_err());
    }

    #[test]
    fn decision_parsing_is_case_insensitive() {
        assert_eq!(Decision::parse("APPROVE"), Some(Decision::Approve));
        assert_eq!(Decision::parse("reject"), Some(Decision::Reject));
        assert_eq!(Decision::parse("delete"), None);
        assert_eq!(Decision::Reject.status(), WithdrawalStatus::Rejected);
        assert_eq!(Decision::Approve.past_tense(), "approved");
    }

    #[test]
    fn status_roundtrips_through_storage_text() {
        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ] {
            assert_eq!(WithdrawalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WithdrawalStatus::parse("processing"), None);
    }
}

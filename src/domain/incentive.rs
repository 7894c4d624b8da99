use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents, TransactionId, UserId};

pub type IncentiveId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncentiveKind {
    /// Bonus for finishing the school year; granted pending, released later.
    Completion,
    /// Bonus for sitting the national exam; granted and released at once.
    Exam,
    /// Recurring monthly installment.
    Stipend,
}

impl IncentiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncentiveKind::Completion => "completion",
            IncentiveKind::Exam => "exam",
            IncentiveKind::Stipend => "stipend",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "completion" => Some(IncentiveKind::Completion),
            "exam" => Some(IncentiveKind::Exam),
            "stipend" => Some(IncentiveKind::Stipend),
            _ => None,
        }
    }
}

impl std::fmt::Display for IncentiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scheme-driven credit, linked to at most one transaction.
///
/// `amount_cents` and `account_id` mirror the linked transaction once one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incentive {
    pub id: IncentiveId,
    pub owner: UserId,
    pub kind: IncentiveKind,
    pub year: Option<i32>,
    pub amount_cents: Cents,
    pub account_id: Option<AccountId>,
    pub transaction_id: Option<TransactionId>,
    pub released: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for a new incentive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncentive {
    pub kind: IncentiveKind,
    pub year: Option<i32>,
    pub amount_cents: Cents,
    pub account_id: Option<AccountId>,
    pub transaction_id: Option<TransactionId>,
    pub released: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incentive_kind_roundtrip() {
        for kind in [
            IncentiveKind::Completion,
            IncentiveKind::Exam,
            IncentiveKind::Stipend,
        ] {
            assert_eq!(IncentiveKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(IncentiveKind::from_str("bonus"), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

pub type AccountId = i64;

/// A place where money sits (bank account, cash, a goal's savings pot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: UserId,
    pub name: String,
    pub opening_balance: Cents,
    /// Running total maintained by the ledger: opening balance plus the
    /// signed effect of every transaction posted against this account.
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_owned_by(&self, owner: UserId) -> bool {
        self.owner == owner
    }
}

/// Naming convention for the dedicated account backing a savings goal.
pub fn goal_account_name(goal_name: &str) -> String {
    format!("Savings: {}", goal_name)
}

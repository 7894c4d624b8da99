use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

pub type CategoryId = i64;

/// Direction of money: `Income` credits an account, `Expense` debits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" | "in" => Some(EntryKind::Income),
            "expense" | "out" => Some(EntryKind::Expense),
            _ => None,
        }
    }

    /// Signed effect of an amount of this kind on an account balance.
    pub fn signed(&self, amount_cents: Cents) -> Cents {
        match self {
            EntryKind::Income => amount_cents,
            EntryKind::Expense => -amount_cents,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub owner: UserId,
    pub name: String,
    pub kind: EntryKind,
}

/// Category names used by paired postings: "<label> (Outflow)" / "<label> (Inflow)".
pub fn paired_category_name(label: &str, kind: EntryKind) -> String {
    match kind {
        EntryKind::Expense => format!("{} (Outflow)", label),
        EntryKind::Income => format!("{} (Inflow)", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_roundtrip() {
        for kind in [EntryKind::Income, EntryKind::Expense] {
            assert_eq!(EntryKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_str("INCOME"), Some(EntryKind::Income));
        assert_eq!(EntryKind::from_str("refund"), None);
    }

    #[test]
    fn test_signed_effect() {
        assert_eq!(EntryKind::Income.signed(2500), 2500);
        assert_eq!(EntryKind::Expense.signed(2500), -2500);
    }

    #[test]
    fn test_paired_category_names() {
        assert_eq!(
            paired_category_name("Transfer", EntryKind::Expense),
            "Transfer (Outflow)"
        );
        assert_eq!(
            paired_category_name("Goal Deposit: Trip", EntryKind::Income),
            "Goal Deposit: Trip (Inflow)"
        );
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Account, AccountId, Cents, PostingSnapshot, Transaction};

/// A single-field change to an account's running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceAdjustment {
    pub account_id: AccountId,
    pub delta: Cents,
}

/// Balance change for a freshly posted transaction.
pub fn plan_create(posting: &PostingSnapshot) -> Vec<BalanceAdjustment> {
    non_zero(vec![BalanceAdjustment {
        account_id: posting.account_id,
        delta: posting.effect(),
    }])
}

/// Balance changes for an edited transaction.
///
/// - account moved: reverse the old effect on the old account, apply the new one on the new account;
/// - same account: apply only `new_effect - old_effect` (nothing when it is zero);
/// - no previous snapshot: treated as a creation.
pub fn plan_update(
    previous: Option<&PostingSnapshot>,
    current: &PostingSnapshot,
) -> Vec<BalanceAdjustment> {
    let Some(previous) = previous else {
        return plan_create(current);
    };

    if previous.account_id != current.account_id {
        return non_zero(vec![
            BalanceAdjustment {
                account_id: previous.account_id,
                delta: -previous.effect(),
            },
            BalanceAdjustment {
                account_id: current.account_id,
                delta: current.effect(),
            },
        ]);
    }

    non_zero(vec![BalanceAdjustment {
        account_id: current.account_id,
        delta: current.effect() - previous.effect(),
    }])
}

/// Balance change undoing a deleted transaction.
pub fn plan_delete(posting: &PostingSnapshot) -> Vec<BalanceAdjustment> {
    non_zero(vec![BalanceAdjustment {
        account_id: posting.account_id,
        delta: -posting.effect(),
    }])
}

fn non_zero(adjustments: Vec<BalanceAdjustment>) -> Vec<BalanceAdjustment> {
    adjustments.into_iter().filter(|a| a.delta != 0).collect()
}

/// Expected running balance of an account: opening balance plus every posting against it.
pub fn expected_balance(account: &Account, transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .filter(|t| t.account_id == account.id)
        .fold(account.opening_balance, |balance, t| balance + t.signed_amount())
}

/// Net signed effect per account over a set of transactions.
pub fn net_effects(transactions: &[Transaction]) -> HashMap<AccountId, Cents> {
    let mut effects: HashMap<AccountId, Cents> = HashMap::new();
    for transaction in transactions {
        *effects.entry(transaction.account_id).or_insert(0) += transaction.signed_amount();
    }
    effects
}

/// An account whose stored balance disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub account_id: AccountId,
    pub account_name: String,
    pub stored: Cents,
    pub expected: Cents,
}

impl BalanceDrift {
    pub fn difference(&self) -> Cents {
        self.stored - self.expected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub drifts: Vec<BalanceDrift>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare stored running balances with balances replayed from the ledger.
pub fn build_integrity_report(
    accounts: &[Account],
    transactions: &[Transaction],
) -> IntegrityReport {
    let effects = net_effects(transactions);
    let drifts = accounts
        .iter()
        .filter_map(|account| {
            let expected =
                account.opening_balance + effects.get(&account.id).copied().unwrap_or(0);
            (expected != account.balance).then(|| BalanceDrift {
                account_id: account.id,
                account_name: account.name.clone(),
                stored: account.balance,
                expected,
            })
        })
        .collect();

    IntegrityReport {
        account_count: accounts.len(),
        transaction_count: transactions.len(),
        drifts,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::domain::EntryKind;

    fn snapshot(account_id: AccountId, kind: EntryKind, amount_cents: Cents) -> PostingSnapshot {
        PostingSnapshot {
            account_id,
            kind,
            amount_cents,
        }
    }

    fn account(id: AccountId, opening: Cents, balance: Cents) -> Account {
        Account {
            id,
            owner: 1,
            name: format!("acc{}", id),
            opening_balance: opening,
            balance,
            created_at: Utc::now(),
        }
    }

    fn tx(id: i64, account_id: AccountId, kind: EntryKind, amount_cents: Cents) -> Transaction {
        Transaction {
            id,
            owner: 1,
            category_id: 1,
            account_id,
            kind,
            description: String::new(),
            amount_cents,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            due_date: None,
            paid: true,
            installments: 1,
        }
    }

    #[test]
    fn test_plan_create_signs_by_kind() {
        assert_eq!(
            plan_create(&snapshot(1, EntryKind::Income, 500)),
            vec![BalanceAdjustment {
                account_id: 1,
                delta: 500
            }]
        );
        assert_eq!(
            plan_create(&snapshot(1, EntryKind::Expense, 500)),
            vec![BalanceAdjustment {
                account_id: 1,
                delta: -500
            }]
        );
    }

    #[test]
    fn test_plan_update_same_account_applies_delta() {
        let before = snapshot(1, EntryKind::Expense, 500);
        let after = snapshot(1, EntryKind::Expense, 800);
        assert_eq!(
            plan_update(Some(&before), &after),
            vec![BalanceAdjustment {
                account_id: 1,
                delta: -300
            }]
        );
    }

    #[test]
    fn test_plan_update_kind_flip() {
        let before = snapshot(1, EntryKind::Expense, 500);
        let after = snapshot(1, EntryKind::Income, 500);
        assert_eq!(
            plan_update(Some(&before), &after),
            vec![BalanceAdjustment {
                account_id: 1,
                delta: 1000
            }]
        );
    }

    #[test]
    fn test_plan_update_without_change_writes_nothing() {
        let before = snapshot(1, EntryKind::Income, 500);
        assert!(plan_update(Some(&before), &before).is_empty());
    }

    #[test]
    fn test_plan_update_account_move() {
        let before = snapshot(1, EntryKind::Income, 500);
        let after = snapshot(2, EntryKind::Expense, 200);
        assert_eq!(
            plan_update(Some(&before), &after),
            vec![
                BalanceAdjustment {
                    account_id: 1,
                    delta: -500
                },
                BalanceAdjustment {
                    account_id: 2,
                    delta: -200
                },
            ]
        );
    }

    #[test]
    fn test_plan_update_without_snapshot_is_a_creation() {
        let after = snapshot(3, EntryKind::Income, 700);
        assert_eq!(plan_update(None, &after), plan_create(&after));
    }

    #[test]
    fn test_plan_delete_reverses() {
        assert_eq!(
            plan_delete(&snapshot(1, EntryKind::Expense, 500)),
            vec![BalanceAdjustment {
                account_id: 1,
                delta: 500
            }]
        );
    }

    #[test]
    fn test_expected_balance() {
        let acc = account(1, 100000, 0);
        let transactions = vec![
            tx(1, 1, EntryKind::Income, 5000),
            tx(2, 1, EntryKind::Expense, 1500),
            tx(3, 2, EntryKind::Expense, 9999),
        ];
        assert_eq!(expected_balance(&acc, &transactions), 103500);
    }

    #[test]
    fn test_integrity_report_detects_drift() {
        let accounts = vec![account(1, 1000, 1500), account(2, 0, 42)];
        let transactions = vec![tx(1, 1, EntryKind::Income, 500)];

        let report = build_integrity_report(&accounts, &transactions);

        assert!(!report.is_healthy());
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].account_id, 2);
        assert_eq!(report.drifts[0].difference(), 42);
    }

    #[test]
    fn test_integrity_report_healthy() {
        let accounts = vec![account(1, 1000, 500)];
        let transactions = vec![tx(1, 1, EntryKind::Expense, 500)];
        assert!(build_integrity_report(&accounts, &transactions).is_healthy());
    }
}

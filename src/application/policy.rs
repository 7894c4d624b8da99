use chrono::{Local, NaiveDate};

use crate::domain::Account;

/// Source of "today" for postings dated by the service.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Chooses the principal account: the default source or destination when an
/// operation is not given an explicit account.
///
/// `accounts` are the owner's accounts in creation (id) order.
pub trait PrincipalAccountPolicy: Send + Sync {
    fn select<'a>(&self, accounts: &'a [Account]) -> Option<&'a Account>;
}

/// Picks the owner's oldest account.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestIdAccount;

impl PrincipalAccountPolicy for LowestIdAccount {
    fn select<'a>(&self, accounts: &'a [Account]) -> Option<&'a Account> {
        accounts.iter().min_by_key(|account| account.id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(id: i64, name: &str) -> Account {
        Account {
            id,
            owner: 1,
            name: name.to_string(),
            opening_balance: 0,
            balance: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_lowest_id_account() {
        let accounts = vec![account(7, "Wallet"), account(3, "Bank"), account(9, "Cash")];
        let selected = LowestIdAccount.select(&accounts).unwrap();
        assert_eq!(selected.id, 3);
        assert!(LowestIdAccount.select(&[]).is_none());
    }

    #[test]
    fn test_fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(FixedClock(date).today(), date);
    }
}

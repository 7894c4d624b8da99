// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use controla::application::{FixedClock, LedgerService};
use controla::domain::{Account, Category, EntryKind, NewTransaction, Transaction, UserId};
use tempfile::TempDir;

/// Date the test clock is frozen at.
pub const TODAY: &str = "2025-03-10";

/// Helper to create a test service with a temporary database and a frozen clock
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap())
        .await?
        .with_clock(FixedClock(parse_date(TODAY)));
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Test fixture: one user with a principal account and two categories
pub struct Household {
    pub owner: UserId,
    pub bank: Account,
    pub cash: Account,
    pub salary: Category,
    pub groceries: Category,
}

impl Household {
    /// "ana" with Bank (1000.00, principal) and Cash (500.00)
    pub async fn create(service: &LedgerService) -> Result<Self> {
        Self::create_for(service, "ana").await
    }

    pub async fn create_for(service: &LedgerService, username: &str) -> Result<Self> {
        let owner = service.create_user(username).await?.id;
        let bank = service.create_account(owner, "Bank", 100000).await?;
        let cash = service.create_account(owner, "Cash", 50000).await?;
        let salary = service
            .create_category(owner, "Salary", EntryKind::Income)
            .await?;
        let groceries = service
            .create_category(owner, "Groceries", EntryKind::Expense)
            .await?;
        Ok(Self {
            owner,
            bank,
            cash,
            salary,
            groceries,
        })
    }

    /// Record a settled expense on Bank.
    pub async fn spend(
        &self,
        service: &LedgerService,
        amount_cents: i64,
        date: &str,
    ) -> Result<Transaction> {
        let new = NewTransaction::new(
            self.groceries.id,
            self.bank.id,
            EntryKind::Expense,
            amount_cents,
            parse_date(date),
        )
        .settled();
        Ok(service.create_transaction(self.owner, new).await?)
    }

    /// Record a settled income on Bank.
    pub async fn earn(
        &self,
        service: &LedgerService,
        amount_cents: i64,
        date: &str,
    ) -> Result<Transaction> {
        let new = NewTransaction::new(
            self.salary.id,
            self.bank.id,
            EntryKind::Income,
            amount_cents,
            parse_date(date),
        )
        .settled();
        Ok(service.create_transaction(self.owner, new).await?)
    }

    pub async fn balance_of(&self, service: &LedgerService, name: &str) -> Result<i64> {
        Ok(service.find_account(self.owner, name).await?.balance)
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AccountId, CategoryId, Cents, EntryKind, UserId};

pub type TransactionId = i64;

pub const MAX_DESCRIPTION_LEN: usize = 120;

/// A single posting against one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub owner: UserId,
    pub category_id: CategoryId,
    pub account_id: AccountId,
    pub kind: EntryKind,
    pub description: String,
    pub amount_cents: Cents,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub paid: bool,
    pub installments: i64,
}

impl Transaction {
    /// The part of the transaction that moves an account balance.
    pub fn posting(&self) -> PostingSnapshot {
        PostingSnapshot {
            account_id: self.account_id,
            kind: self.kind,
            amount_cents: self.amount_cents,
        }
    }

    pub fn signed_amount(&self) -> Cents {
        self.kind.signed(self.amount_cents)
    }
}

/// `(account, kind, amount)` of a transaction as it was last posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingSnapshot {
    pub account_id: AccountId,
    pub kind: EntryKind,
    pub amount_cents: Cents,
}

impl PostingSnapshot {
    pub fn effect(&self) -> Cents {
        self.kind.signed(self.amount_cents)
    }
}

/// Input for a new transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub category_id: CategoryId,
    pub account_id: AccountId,
    pub kind: EntryKind,
    pub description: String,
    pub amount_cents: Cents,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub paid: bool,
    pub installments: i64,
}

impl NewTransaction {
    pub fn new(
        category_id: CategoryId,
        account_id: AccountId,
        kind: EntryKind,
        amount_cents: Cents,
        date: NaiveDate,
    ) -> Self {
        Self {
            category_id,
            account_id,
            kind,
            description: String::new(),
            amount_cents,
            date,
            due_date: None,
            paid: false,
            installments: 1,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_installments(mut self, installments: i64) -> Self {
        self.installments = installments;
        self
    }

    pub fn settled(mut self) -> Self {
        self.paid = true;
        self
    }

    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        validate_fields(self.amount_cents, &self.description, self.installments)
    }
}

/// Partial update of a transaction; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionChanges {
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    pub kind: Option<EntryKind>,
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
    pub date: Option<NaiveDate>,
    pub due_date: Option<Option<NaiveDate>>,
    pub paid: Option<bool>,
    pub installments: Option<i64>,
}

impl TransactionChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changes on top of an existing transaction, validating the result.
    pub fn apply_to(
        &self,
        current: &Transaction,
    ) -> Result<Transaction, TransactionValidationError> {
        let updated = Transaction {
            id: current.id,
            owner: current.owner,
            category_id: self.category_id.unwrap_or(current.category_id),
            account_id: self.account_id.unwrap_or(current.account_id),
            kind: self.kind.unwrap_or(current.kind),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            amount_cents: self.amount_cents.unwrap_or(current.amount_cents),
            date: self.date.unwrap_or(current.date),
            due_date: self.due_date.unwrap_or(current.due_date),
            paid: self.paid.unwrap_or(current.paid),
            installments: self.installments.unwrap_or(current.installments),
        };
        validate_fields(
            updated.amount_cents,
            &updated.description,
            updated.installments,
        )?;
        Ok(updated)
    }
}

/// Criteria for listing transactions. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub kind: Option<EntryKind>,
    pub paid: Option<bool>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

fn validate_fields(
    amount_cents: Cents,
    description: &str,
    installments: i64,
) -> Result<(), TransactionValidationError> {
    if amount_cents <= 0 {
        return Err(TransactionValidationError::NonPositiveAmount(amount_cents));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(TransactionValidationError::DescriptionTooLong);
    }
    if installments < 1 {
        return Err(TransactionValidationError::InvalidInstallments(installments));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    NonPositiveAmount(Cents),
    DescriptionTooLong,
    InvalidInstallments(i64),
}

impl std::fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionValidationError::NonPositiveAmount(amount) => {
                write!(f, "transaction amount must be positive (got {} cents)", amount)
            }
            TransactionValidationError::DescriptionTooLong => write!(
                f,
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            ),
            TransactionValidationError::InvalidInstallments(n) => {
                write!(f, "installments must be at least 1 (got {})", n)
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{
    Account, AccountId, Cents, EntryKind, GoalId, Incentive, IncentiveId, IncentiveKind,
    NewIncentive, NewTransaction, Transaction, UserId,
};
use crate::storage::{accounts, categories, commit, goals, incentives, transactions};

use super::maintainer::{post_transaction, repost_transaction};
use super::postings::{PairedPosting, create_paired_postings};
use super::service::owned_account;
use super::{AppError, LedgerService};

const TRANSFER_LABEL: &str = "Transfer";

/// Result of a transfer between two accounts.
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub postings: PairedPosting,
    pub source: Account,
    pub destination: Account,
}

/// Result of a deposit into a goal's dedicated account.
#[derive(Debug, Clone)]
pub struct GoalDepositResult {
    pub postings: PairedPosting,
    pub principal: Account,
    pub goal_account: Account,
}

/// An incentive together with the transaction that pays it.
#[derive(Debug, Clone)]
pub struct IncentivePosting {
    pub incentive: Incentive,
    pub transaction: Transaction,
}

impl LedgerService {
    // ========================
    // Money movements
    // ========================

    /// Move money between two of the owner's accounts as a paired posting.
    #[tracing::instrument(skip(self))]
    pub async fn transfer(
        &self,
        owner: UserId,
        source_id: AccountId,
        destination_id: AccountId,
        amount_cents: Cents,
    ) -> Result<TransferResult, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidTransfer(
                "amount must be positive".to_string(),
            ));
        }
        if source_id == destination_id {
            return Err(AppError::InvalidTransfer(
                "source and destination must be different accounts".to_string(),
            ));
        }

        let mut tx = self.repo.begin().await?;
        let source = transfer_account(&mut tx, owner, source_id).await?;
        let destination = transfer_account(&mut tx, owner, destination_id).await?;

        let postings = create_paired_postings(
            &mut tx,
            &source,
            &destination,
            amount_cents,
            TRANSFER_LABEL,
            self.today(),
        )
        .await?;

        let source = owned_account(&mut tx, owner, source_id).await?;
        let destination = owned_account(&mut tx, owner, destination_id).await?;
        commit(tx).await?;

        info!(
            source = %source.name,
            destination = %destination.name,
            amount = amount_cents,
            "Transfer committed"
        );
        Ok(TransferResult {
            postings,
            source,
            destination,
        })
    }

    /// Move money from the principal account into a goal's dedicated account.
    #[tracing::instrument(skip(self))]
    pub async fn deposit_to_goal(
        &self,
        owner: UserId,
        goal_id: GoalId,
        amount_cents: Cents,
    ) -> Result<GoalDepositResult, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::GoalDeposit("amount must be positive".to_string()));
        }

        let mut tx = self.repo.begin().await?;
        let goal = goals::find_goal(&mut tx, goal_id)
            .await?
            .ok_or(AppError::GoalNotFound(goal_id))?;
        if goal.owner != owner {
            return Err(AppError::GoalDeposit(format!(
                "goal {} does not belong to the caller",
                goal_id
            )));
        }
        let Some(goal_account_id) = goal.account_id else {
            return Err(AppError::GoalDeposit(format!(
                "goal '{}' has no linked account",
                goal.name
            )));
        };
        if !goal.active {
            return Err(AppError::GoalDeposit(format!(
                "goal '{}' is not active",
                goal.name
            )));
        }

        let principal = self
            .principal_account(&mut tx, owner)
            .await?
            .ok_or_else(|| AppError::GoalDeposit("no principal account found".to_string()))?;
        if principal.id == goal_account_id {
            return Err(AppError::GoalDeposit(format!(
                "principal account '{}' is the goal's own account",
                principal.name
            )));
        }
        let goal_account = accounts::find_owned_account(&mut tx, owner, goal_account_id)
            .await?
            .ok_or_else(|| {
                AppError::GoalDeposit(format!("goal '{}' has no linked account", goal.name))
            })?;

        let label = format!("Goal Deposit: {}", goal.name);
        let postings = create_paired_postings(
            &mut tx,
            &principal,
            &goal_account,
            amount_cents,
            &label,
            self.today(),
        )
        .await?;

        let principal = owned_account(&mut tx, owner, principal.id).await?;
        let goal_account = owned_account(&mut tx, owner, goal_account.id).await?;
        commit(tx).await?;

        info!(
            goal_id,
            principal = %principal.name,
            amount = amount_cents,
            "Goal deposit committed"
        );
        Ok(GoalDepositResult {
            postings,
            principal,
            goal_account,
        })
    }

    // ========================
    // Stipend installments
    // ========================

    /// Mark the earliest unpaid stipend installment dated in `month/year` as paid.
    ///
    /// The balance is left alone: the installment was counted when created.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_pending_receivable(
        &self,
        owner: UserId,
        month: u32,
        year: i32,
    ) -> Result<Transaction, AppError> {
        let (from, to) = month_bounds(month, year)?;

        let mut tx = self.repo.begin().await?;
        let pending = transactions::earliest_pending_income(
            &mut tx,
            owner,
            &self.incentives.stipend_category,
            from,
            to,
        )
        .await?
        .ok_or_else(|| {
            AppError::ReceivableConfirmation(format!(
                "no pending installment for {:02}/{}",
                month, year
            ))
        })?;

        let mut confirmed = pending.clone();
        confirmed.paid = true;
        repost_transaction(&mut tx, &pending, &confirmed).await?;
        commit(tx).await?;

        info!(transaction_id = confirmed.id, month, year, "Confirmed installment");
        Ok(confirmed)
    }

    /// Record the stipend installment for `month/year` as an unpaid income
    /// dated today, with a released stipend incentive mirroring it.
    #[tracing::instrument(skip(self))]
    pub async fn create_monthly_stipend_installment(
        &self,
        owner: UserId,
        month: u32,
        year: i32,
        account_id: Option<AccountId>,
    ) -> Result<IncentivePosting, AppError> {
        let (from, to) = month_bounds(month, year)?;
        let amount_cents = self.incentives.stipend_cents;

        let mut tx = self.repo.begin().await?;
        let account = self
            .resolve_account(&mut tx, owner, account_id)
            .await?
            .ok_or_else(|| {
                AppError::ReceivableConfirmation("no account available for the installment".to_string())
            })?;

        let category = categories::get_or_create_category(
            &mut tx,
            owner,
            &self.incentives.stipend_category,
            EntryKind::Income,
        )
        .await?;

        let description = installment_description(month, year);
        if transactions::installment_exists(&mut tx, owner, category.id, from, to, &description)
            .await?
        {
            return Err(AppError::ReceivableConfirmation(format!(
                "installment for {:02}/{} already exists",
                month, year
            )));
        }

        let transaction = post_transaction(
            &mut tx,
            owner,
            &NewTransaction::new(
                category.id,
                account.id,
                EntryKind::Income,
                amount_cents,
                self.today(),
            )
            .with_description(description),
        )
        .await?;

        let incentive = incentives::insert_incentive(
            &mut tx,
            owner,
            &NewIncentive {
                kind: IncentiveKind::Stipend,
                year: Some(year),
                amount_cents,
                account_id: Some(account.id),
                transaction_id: Some(transaction.id),
                released: true,
            },
        )
        .await?;
        commit(tx).await?;

        info!(
            transaction_id = transaction.id,
            account = %account.name,
            month,
            year,
            "Created stipend installment"
        );
        Ok(IncentivePosting {
            incentive,
            transaction,
        })
    }

    // ========================
    // Incentives
    // ========================

    /// Grant the completion incentive for `year` as a pending (unreleased) record.
    #[tracing::instrument(skip(self))]
    pub async fn grant_completion_incentive(
        &self,
        owner: UserId,
        year: i32,
        account_id: Option<AccountId>,
    ) -> Result<Incentive, AppError> {
        let mut tx = self.repo.begin().await?;
        if incentives::incentive_exists(&mut tx, owner, IncentiveKind::Completion, Some(year))
            .await?
        {
            return Err(AppError::GoalDeposit(format!(
                "completion incentive already granted for {}",
                year
            )));
        }

        let account = self.resolve_account(&mut tx, owner, account_id).await?;
        let incentive = incentives::insert_incentive(
            &mut tx,
            owner,
            &NewIncentive {
                kind: IncentiveKind::Completion,
                year: Some(year),
                amount_cents: self.incentives.completion_cents,
                account_id: account.map(|a| a.id),
                transaction_id: None,
                released: false,
            },
        )
        .await?;
        commit(tx).await?;

        info!(incentive_id = incentive.id, year, "Granted completion incentive");
        Ok(incentive)
    }

    /// Pay out a pending completion incentive as a single settled income.
    #[tracing::instrument(skip(self))]
    pub async fn release_completion_incentive(
        &self,
        owner: UserId,
        incentive_id: IncentiveId,
    ) -> Result<IncentivePosting, AppError> {
        let mut tx = self.repo.begin().await?;
        let incentive = incentives::find_owned_incentive(&mut tx, owner, incentive_id)
            .await?
            .ok_or(AppError::IncentiveNotFound(incentive_id))?;
        if incentive.kind != IncentiveKind::Completion {
            return Err(AppError::Validation(format!(
                "incentive {} is a {} incentive, not a completion incentive",
                incentive_id, incentive.kind
            )));
        }
        if incentive.released {
            return Err(AppError::GoalDeposit(format!(
                "incentive {} already released",
                incentive_id
            )));
        }

        let linked = match incentive.account_id {
            Some(id) => accounts::find_owned_account(&mut tx, owner, id).await?,
            None => None,
        };
        let account = match linked {
            Some(account) => account,
            None => self
                .principal_account(&mut tx, owner)
                .await?
                .ok_or_else(|| {
                    AppError::GoalDeposit("no account available for the release".to_string())
                })?,
        };

        let category = categories::get_or_create_category(
            &mut tx,
            owner,
            &self.incentives.completion_category,
            EntryKind::Income,
        )
        .await?;

        let description = match incentive.year {
            Some(year) => format!("{} {}", self.incentives.completion_category, year),
            None => self.incentives.completion_category.clone(),
        };
        let transaction = post_transaction(
            &mut tx,
            owner,
            &NewTransaction::new(
                category.id,
                account.id,
                EntryKind::Income,
                incentive.amount_cents,
                self.today(),
            )
            .with_description(description)
            .settled(),
        )
        .await?;

        incentives::mark_released(&mut tx, incentive.id, transaction.id, account.id).await?;
        commit(tx).await?;

        info!(
            incentive_id,
            transaction_id = transaction.id,
            account = %account.name,
            "Released completion incentive"
        );
        Ok(IncentivePosting {
            incentive: Incentive {
                account_id: Some(account.id),
                transaction_id: Some(transaction.id),
                released: true,
                ..incentive
            },
            transaction,
        })
    }

    /// Grant and pay the exam incentive at once.
    #[tracing::instrument(skip(self))]
    pub async fn grant_exam_incentive(
        &self,
        owner: UserId,
        account_id: Option<AccountId>,
        year: Option<i32>,
    ) -> Result<IncentivePosting, AppError> {
        let amount_cents = self.incentives.exam_cents;

        let mut tx = self.repo.begin().await?;
        if incentives::incentive_exists(&mut tx, owner, IncentiveKind::Exam, year).await? {
            return Err(AppError::GoalDeposit(match year {
                Some(year) => format!("exam incentive already granted for {}", year),
                None => "exam incentive already granted".to_string(),
            }));
        }

        let account = self
            .resolve_account(&mut tx, owner, account_id)
            .await?
            .ok_or_else(|| AppError::GoalDeposit("no account available for the grant".to_string()))?;

        let category = categories::get_or_create_category(
            &mut tx,
            owner,
            &self.incentives.exam_category,
            EntryKind::Income,
        )
        .await?;

        let transaction = post_transaction(
            &mut tx,
            owner,
            &NewTransaction::new(
                category.id,
                account.id,
                EntryKind::Income,
                amount_cents,
                self.today(),
            )
            .with_description(self.incentives.exam_category.clone())
            .settled(),
        )
        .await?;

        let incentive = incentives::insert_incentive(
            &mut tx,
            owner,
            &NewIncentive {
                kind: IncentiveKind::Exam,
                year,
                amount_cents,
                account_id: Some(account.id),
                transaction_id: Some(transaction.id),
                released: true,
            },
        )
        .await?;
        commit(tx).await?;

        info!(
            incentive_id = incentive.id,
            transaction_id = transaction.id,
            account = %account.name,
            "Granted exam incentive"
        );
        Ok(IncentivePosting {
            incentive,
            transaction,
        })
    }

    pub async fn get_incentive(
        &self,
        owner: UserId,
        id: IncentiveId,
    ) -> Result<Incentive, AppError> {
        let mut conn = self.repo.acquire().await?;
        incentives::find_owned_incentive(&mut conn, owner, id)
            .await?
            .ok_or(AppError::IncentiveNotFound(id))
    }

    /// Newest first, optionally of a single kind.
    pub async fn list_incentives(
        &self,
        owner: UserId,
        kind: Option<IncentiveKind>,
    ) -> Result<Vec<Incentive>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(incentives::list_incentives(&mut conn, owner, kind).await?)
    }

    /// The account chosen by the principal account policy, if the owner has any.
    pub(crate) async fn principal_account(
        &self,
        conn: &mut SqliteConnection,
        owner: UserId,
    ) -> Result<Option<Account>, AppError> {
        let accounts = accounts::list_accounts_by_id(conn, owner).await?;
        Ok(self.principal.select(&accounts).cloned())
    }

    /// The explicitly requested account, or the principal account.
    async fn resolve_account(
        &self,
        conn: &mut SqliteConnection,
        owner: UserId,
        account_id: Option<AccountId>,
    ) -> Result<Option<Account>, AppError> {
        match account_id {
            Some(id) => owned_account(conn, owner, id).await.map(Some),
            None => self.principal_account(conn, owner).await,
        }
    }
}

/// Load a transfer endpoint, refusing accounts of other owners.
async fn transfer_account(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: AccountId,
) -> Result<Account, AppError> {
    let account = accounts::find_account(conn, id)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?;
    if !account.is_owned_by(owner) {
        return Err(AppError::InvalidTransfer(format!(
            "account {} does not belong to the caller",
            id
        )));
    }
    Ok(account)
}

/// Description carried by the stipend installment of a month.
pub fn installment_description(month: u32, year: i32) -> String {
    format!("Monthly Installment {:02}/{}", month, year)
}

/// First and last day of a month, for months 1-12 of years 2000-2100.
fn month_bounds(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::ReceivableConfirmation(format!(
            "month must be between 1 and 12 (got {})",
            month
        )));
    }
    if !(2000..=2100).contains(&year) {
        return Err(AppError::ReceivableConfirmation(format!(
            "year must be between 2000 and 2100 (got {})",
            year
        )));
    }

    let invalid = || AppError::ReceivableConfirmation(format!("invalid month {:02}/{}", month, year));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    let last = next.pred_opt().ok_or_else(invalid)?;
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds(2, 2024).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (first, last) = month_bounds(12, 2025).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_month_bounds_rejects_out_of_range() {
        assert!(matches!(
            month_bounds(0, 2025),
            Err(AppError::ReceivableConfirmation(_))
        ));
        assert!(matches!(
            month_bounds(13, 2025),
            Err(AppError::ReceivableConfirmation(_))
        ));
        assert!(matches!(
            month_bounds(6, 1999),
            Err(AppError::ReceivableConfirmation(_))
        ));
        assert!(matches!(
            month_bounds(6, 2101),
            Err(AppError::ReceivableConfirmation(_))
        ));
        assert!(month_bounds(1, 2000).is_ok());
        assert!(month_bounds(12, 2100).is_ok());
    }

    #[test]
    fn test_installment_description() {
        assert_eq!(installment_description(3, 2025), "Monthly Installment 03/2025");
    }
}

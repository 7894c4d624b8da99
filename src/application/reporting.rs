use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{
    Cents, EntryKind, GoalProgress, Incentive, IncentiveKind, IntegrityReport, Transaction,
    TransactionFilter, UserId, build_integrity_report,
};
use crate::storage::aggregates::{self, CategoryTotal, DateRange};
use crate::storage::{accounts, commit, goals, incentives, transactions};

use super::{AppError, LedgerService};

const RECENT_TRANSACTIONS: i64 = 15;

/// Read-only summary of an owner's ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub total_income: Cents,
    pub total_expense: Cents,
    pub net: Cents,
    pub expense_categories: Vec<CategoryTotal>,
    pub income_categories: Vec<CategoryTotal>,
    /// Paid income booked in the reserved incentive categories, all time.
    pub incentives_received: Cents,
    /// Unpaid income in the stipend category, all time.
    pub stipend_pending: Cents,
    pub latest_stipend: Option<Transaction>,
    pub completion_incentives: Vec<Incentive>,
    pub exam_incentives: Vec<Incentive>,
    pub accounts: Vec<AccountBalance>,
    pub goals: Vec<GoalProgress>,
    pub recent_transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub account_name: String,
    pub balance: Cents,
}

impl LedgerService {
    // ========================
    // Reporting
    // ========================

    /// Build the dashboard. Totals and category breakdowns cover paid
    /// transactions dated within `[from, to]` (either bound optional).
    pub async fn dashboard(
        &self,
        owner: UserId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Dashboard, AppError> {
        let range = DateRange::new(from, to);
        let settings = &self.incentives;
        let mut conn = self.repo.acquire().await?;

        let total_income = aggregates::sum_paid(&mut conn, owner, EntryKind::Income, range).await?;
        let total_expense =
            aggregates::sum_paid(&mut conn, owner, EntryKind::Expense, range).await?;
        let expense_categories =
            aggregates::paid_totals_by_category(&mut conn, owner, EntryKind::Expense, range)
                .await?;
        let income_categories =
            aggregates::paid_totals_by_category(&mut conn, owner, EntryKind::Income, range)
                .await?;

        let incentives_received = aggregates::sum_in_categories(
            &mut conn,
            owner,
            EntryKind::Income,
            true,
            &settings.category_names(),
        )
        .await?;
        let stipend_pending = aggregates::sum_in_categories(
            &mut conn,
            owner,
            EntryKind::Income,
            false,
            &[settings.stipend_category.as_str()],
        )
        .await?;
        let latest_stipend =
            aggregates::latest_in_category(&mut conn, owner, &settings.stipend_category).await?;

        let completion_incentives =
            incentives::list_incentives(&mut conn, owner, Some(IncentiveKind::Completion)).await?;
        let exam_incentives =
            incentives::list_incentives(&mut conn, owner, Some(IncentiveKind::Exam)).await?;

        let account_list = accounts::list_accounts(&mut conn, owner).await?;
        let balances: HashMap<_, _> = account_list.iter().map(|a| (a.id, a.balance)).collect();
        let goal_progress: Vec<GoalProgress> = goals::list_goals(&mut conn, owner)
            .await?
            .iter()
            .map(|goal| {
                let current = goal
                    .account_id
                    .and_then(|id| balances.get(&id).copied())
                    .unwrap_or(0);
                GoalProgress::compute(goal, current)
            })
            .collect();

        let recent_transactions = transactions::list_transactions(
            &mut conn,
            owner,
            &TransactionFilter {
                limit: Some(RECENT_TRANSACTIONS),
                ..Default::default()
            },
        )
        .await?;

        Ok(Dashboard {
            from_date: from,
            to_date: to,
            total_income,
            total_expense,
            net: total_income - total_expense,
            expense_categories,
            income_categories,
            incentives_received,
            stipend_pending,
            latest_stipend,
            completion_incentives,
            exam_incentives,
            accounts: account_list
                .into_iter()
                .map(|a| AccountBalance {
                    account_name: a.name,
                    balance: a.balance,
                })
                .collect(),
            goals: goal_progress,
            recent_transactions,
        })
    }

    // ========================
    // Integrity operations
    // ========================

    /// Compare every stored running balance with the ledger replay.
    pub async fn check_integrity(&self, owner: UserId) -> Result<IntegrityReport, AppError> {
        let mut conn = self.repo.acquire().await?;
        let account_list = accounts::list_accounts_by_id(&mut conn, owner).await?;
        let ledger = transactions::list_owner_transactions(&mut conn, owner).await?;
        Ok(build_integrity_report(&account_list, &ledger))
    }

    /// Rewrite every drifted running balance from the ledger in one unit of
    /// work. Returns the drifts found before the repair.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_balances(&self, owner: UserId) -> Result<IntegrityReport, AppError> {
        let mut tx = self.repo.begin().await?;
        let account_list = accounts::list_accounts_by_id(&mut tx, owner).await?;
        let ledger = transactions::list_owner_transactions(&mut tx, owner).await?;
        let report = build_integrity_report(&account_list, &ledger);

        for drift in &report.drifts {
            warn!(
                account = %drift.account_name,
                stored = drift.stored,
                expected = drift.expected,
                "Rewriting drifted balance"
            );
            accounts::set_balance(&mut tx, drift.account_id, drift.expected).await?;
        }
        commit(tx).await?;

        info!(
            accounts = report.account_count,
            repaired = report.drifts.len(),
            "Rebuilt balances"
        );
        Ok(report)
    }
}

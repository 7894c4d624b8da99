//! The wrapped transaction write path.
//!
//! Every insert, update and delete of a transaction goes through these
//! functions, which run on the caller's open unit of work and, in order:
//! write the row, apply the balance adjustments for it, then bring the linked
//! incentive in line with the posted values.

use anyhow::Result;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::domain::{
    BalanceAdjustment, NewTransaction, Transaction, UserId, plan_create, plan_delete, plan_update,
};
use crate::storage::{accounts, incentives, reminders, transactions};

/// Insert a transaction and post its effect.
pub(crate) async fn post_transaction(
    conn: &mut SqliteConnection,
    owner: UserId,
    new: &NewTransaction,
) -> Result<Transaction> {
    let transaction = transactions::insert_transaction(conn, owner, new).await?;
    apply_adjustments(conn, &plan_create(&transaction.posting())).await?;
    Ok(transaction)
}

/// Persist an edited transaction and post the difference against the state
/// it had when it was loaded (`previous`).
pub(crate) async fn repost_transaction(
    conn: &mut SqliteConnection,
    previous: &Transaction,
    updated: &Transaction,
) -> Result<()> {
    transactions::update_transaction(conn, updated).await?;
    apply_adjustments(
        conn,
        &plan_update(Some(&previous.posting()), &updated.posting()),
    )
    .await?;

    let synced = incentives::sync_incentive_from_transaction(conn, updated).await?;
    if synced > 0 {
        debug!(transaction_id = updated.id, "Synchronized linked incentive");
    }
    Ok(())
}

/// Delete a transaction and reverse its effect. The linked incentive goes with
/// it; reminder and notification links are cleared.
pub(crate) async fn unpost_transaction(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> Result<()> {
    let removed = incentives::delete_incentives_for_transaction(conn, transaction.id).await?;
    if removed > 0 {
        debug!(transaction_id = transaction.id, "Deleted linked incentive");
    }
    reminders::detach_transaction(conn, transaction.id).await?;
    transactions::delete_transaction(conn, transaction.id).await?;
    apply_adjustments(conn, &plan_delete(&transaction.posting())).await?;
    Ok(())
}

/// Apply balance adjustments as atomic increments.
///
/// An adjustment against an account that no longer exists is skipped.
pub(crate) async fn apply_adjustments(
    conn: &mut SqliteConnection,
    adjustments: &[BalanceAdjustment],
) -> Result<()> {
    for adjustment in adjustments {
        let applied = accounts::adjust_balance(conn, adjustment.account_id, adjustment.delta).await?;
        if applied {
            debug!(
                account_id = adjustment.account_id,
                delta = adjustment.delta,
                "Adjusted account balance"
            );
        } else {
            warn!(
                account_id = adjustment.account_id,
                delta = adjustment.delta,
                "Account missing, balance adjustment skipped"
            );
        }
    }
    Ok(())
}

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{
    AccountId, Incentive, IncentiveId, IncentiveKind, NewIncentive, Transaction, TransactionId,
    UserId,
};

use super::timestamp_from_sql;

const INCENTIVE_COLUMNS: &str =
    "id, owner_id, kind, year, amount_cents, account_id, transaction_id, released, created_at";

pub async fn insert_incentive(
    conn: &mut SqliteConnection,
    owner: UserId,
    new: &NewIncentive,
) -> Result<Incentive> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO incentives
            (owner_id, kind, year, amount_cents, account_id, transaction_id, released, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(new.kind.as_str())
    .bind(new.year)
    .bind(new.amount_cents)
    .bind(new.account_id)
    .bind(new.transaction_id)
    .bind(new.released)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save incentive")?;

    Ok(Incentive {
        id: row.get("id"),
        owner,
        kind: new.kind,
        year: new.year,
        amount_cents: new.amount_cents,
        account_id: new.account_id,
        transaction_id: new.transaction_id,
        released: new.released,
        created_at,
    })
}

pub async fn find_owned_incentive(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: IncentiveId,
) -> Result<Option<Incentive>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM incentives WHERE id = ? AND owner_id = ?",
        INCENTIVE_COLUMNS
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch incentive")?;

    row.as_ref().map(row_to_incentive).transpose()
}

pub async fn list_incentives(
    conn: &mut SqliteConnection,
    owner: UserId,
    kind: Option<IncentiveKind>,
) -> Result<Vec<Incentive>> {
    let mut query = format!(
        "SELECT {} FROM incentives WHERE owner_id = ?",
        INCENTIVE_COLUMNS
    );
    if kind.is_some() {
        query.push_str(" AND kind = ?");
    }
    query.push_str(" ORDER BY created_at DESC, id DESC");

    let mut sql_query = sqlx::query(&query).bind(owner);
    if let Some(kind) = kind {
        sql_query = sql_query.bind(kind.as_str());
    }

    let rows = sql_query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list incentives")?;

    rows.iter().map(row_to_incentive).collect()
}

/// Whether an incentive of `kind` already exists for `(owner, year)`.
/// A `None` year matches only incentives recorded without a year.
pub async fn incentive_exists(
    conn: &mut SqliteConnection,
    owner: UserId,
    kind: IncentiveKind,
    year: Option<i32>,
) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM incentives WHERE owner_id = ? AND kind = ? AND year IS ?
        ) AS found
        "#,
    )
    .bind(owner)
    .bind(kind.as_str())
    .bind(year)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to check for existing incentive")?;

    Ok(row.get("found"))
}

/// Copy a transaction's posted amount and account onto the incentive linked
/// to it. Returns the number of incentives touched (0 or 1).
pub async fn sync_incentive_from_transaction(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE incentives
        SET amount_cents = ?, account_id = ?
        WHERE transaction_id = ?
          AND (amount_cents != ? OR account_id IS NOT ?)
        "#,
    )
    .bind(transaction.amount_cents)
    .bind(transaction.account_id)
    .bind(transaction.id)
    .bind(transaction.amount_cents)
    .bind(transaction.account_id)
    .execute(&mut *conn)
    .await
    .context("Failed to synchronize incentive")?;
    Ok(result.rows_affected())
}

pub async fn delete_incentives_for_transaction(
    conn: &mut SqliteConnection,
    transaction_id: TransactionId,
) -> Result<u64> {
    let result = sqlx::query("DELETE FROM incentives WHERE transaction_id = ?")
        .bind(transaction_id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete linked incentive")?;
    Ok(result.rows_affected())
}

/// Link a released incentive to the transaction that paid it out.
pub async fn mark_released(
    conn: &mut SqliteConnection,
    id: IncentiveId,
    transaction_id: TransactionId,
    account_id: AccountId,
) -> Result<()> {
    sqlx::query(
        "UPDATE incentives SET released = 1, transaction_id = ?, account_id = ? WHERE id = ?",
    )
    .bind(transaction_id)
    .bind(account_id)
    .bind(id)
    .execute(&mut *conn)
    .await
    .context("Failed to release incentive")?;
    Ok(())
}

fn row_to_incentive(row: &SqliteRow) -> Result<Incentive> {
    let kind: String = row.get("kind");
    let created_at: String = row.get("created_at");
    Ok(Incentive {
        id: row.get("id"),
        owner: row.get("owner_id"),
        kind: IncentiveKind::from_str(&kind)
            .ok_or_else(|| anyhow!("Invalid incentive kind: {}", kind))?,
        year: row.get("year"),
        amount_cents: row.get("amount_cents"),
        account_id: row.get("account_id"),
        transaction_id: row.get("transaction_id"),
        released: row.get("released"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

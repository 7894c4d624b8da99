use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{
    CategoryId, EntryKind, NewTransaction, Transaction, TransactionFilter, TransactionId, UserId,
};

use super::{date_from_sql, date_to_sql, optional_date_from_sql};

const TRANSACTION_COLUMNS: &str = "id, owner_id, category_id, account_id, kind, description, \
     amount_cents, date, due_date, paid, installments";

pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    owner: UserId,
    new: &NewTransaction,
) -> Result<Transaction> {
    let row = sqlx::query(
        r#"
        INSERT INTO transactions
            (owner_id, category_id, account_id, kind, description, amount_cents, date, due_date, paid, installments)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(new.category_id)
    .bind(new.account_id)
    .bind(new.kind.as_str())
    .bind(&new.description)
    .bind(new.amount_cents)
    .bind(date_to_sql(new.date))
    .bind(new.due_date.map(date_to_sql))
    .bind(new.paid)
    .bind(new.installments)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save transaction")?;

    Ok(Transaction {
        id: row.get("id"),
        owner,
        category_id: new.category_id,
        account_id: new.account_id,
        kind: new.kind,
        description: new.description.clone(),
        amount_cents: new.amount_cents,
        date: new.date,
        due_date: new.due_date,
        paid: new.paid,
        installments: new.installments,
    })
}

pub async fn find_owned_transaction(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: TransactionId,
) -> Result<Option<Transaction>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM transactions WHERE id = ? AND owner_id = ?",
        TRANSACTION_COLUMNS
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch transaction")?;

    row.as_ref().map(row_to_transaction).transpose()
}

/// Overwrite every mutable column of a stored transaction.
pub async fn update_transaction(conn: &mut SqliteConnection, transaction: &Transaction) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET category_id = ?, account_id = ?, kind = ?, description = ?, amount_cents = ?,
            date = ?, due_date = ?, paid = ?, installments = ?
        WHERE id = ?
        "#,
    )
    .bind(transaction.category_id)
    .bind(transaction.account_id)
    .bind(transaction.kind.as_str())
    .bind(&transaction.description)
    .bind(transaction.amount_cents)
    .bind(date_to_sql(transaction.date))
    .bind(transaction.due_date.map(date_to_sql))
    .bind(transaction.paid)
    .bind(transaction.installments)
    .bind(transaction.id)
    .execute(&mut *conn)
    .await
    .context("Failed to update transaction")?;
    Ok(())
}

pub async fn delete_transaction(conn: &mut SqliteConnection, id: TransactionId) -> Result<()> {
    sqlx::query("DELETE FROM transactions WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete transaction")?;
    Ok(())
}

/// List an owner's transactions matching a filter, newest first.
pub async fn list_transactions(
    conn: &mut SqliteConnection,
    owner: UserId,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>> {
    let mut query = format!(
        "SELECT {} FROM transactions WHERE owner_id = ?",
        TRANSACTION_COLUMNS
    );

    let from_str = filter.from.map(date_to_sql);
    let to_str = filter.to.map(date_to_sql);

    if filter.account_id.is_some() {
        query.push_str(" AND account_id = ?");
    }
    if filter.category_id.is_some() {
        query.push_str(" AND category_id = ?");
    }
    if filter.kind.is_some() {
        query.push_str(" AND kind = ?");
    }
    if filter.paid.is_some() {
        query.push_str(" AND paid = ?");
    }
    if from_str.is_some() {
        query.push_str(" AND date >= ?");
    }
    if to_str.is_some() {
        query.push_str(" AND date <= ?");
    }

    query.push_str(" ORDER BY date DESC, id DESC");

    if let Some(limit) = filter.limit {
        query.push_str(&format!(" LIMIT {}", limit.max(0)));
    }

    let mut sql_query = sqlx::query(&query).bind(owner);

    if let Some(account_id) = filter.account_id {
        sql_query = sql_query.bind(account_id);
    }
    if let Some(category_id) = filter.category_id {
        sql_query = sql_query.bind(category_id);
    }
    if let Some(kind) = filter.kind {
        sql_query = sql_query.bind(kind.as_str());
    }
    if let Some(paid) = filter.paid {
        sql_query = sql_query.bind(paid);
    }
    if let Some(ref from) = from_str {
        sql_query = sql_query.bind(from);
    }
    if let Some(ref to) = to_str {
        sql_query = sql_query.bind(to);
    }

    let rows = sql_query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list transactions")?;

    rows.iter().map(row_to_transaction).collect()
}

/// Every transaction of an owner, in id order (ledger replay order).
pub async fn list_owner_transactions(
    conn: &mut SqliteConnection,
    owner: UserId,
) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM transactions WHERE owner_id = ? ORDER BY id",
        TRANSACTION_COLUMNS
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list transactions")?;

    rows.iter().map(row_to_transaction).collect()
}

/// The earliest unpaid income transaction dated in `[from, to]` whose
/// category is named `category_name` (case-insensitive).
pub async fn earliest_pending_income(
    conn: &mut SqliteConnection,
    owner: UserId,
    category_name: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<Transaction>> {
    let row = sqlx::query(
        r#"
        SELECT t.id, t.owner_id, t.category_id, t.account_id, t.kind, t.description,
               t.amount_cents, t.date, t.due_date, t.paid, t.installments
        FROM transactions t
        JOIN categories c ON c.id = t.category_id
        WHERE t.owner_id = ?
          AND t.kind = 'income'
          AND t.paid = 0
          AND c.name = ? COLLATE NOCASE
          AND t.date >= ? AND t.date <= ?
        ORDER BY t.date ASC, t.id ASC
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(category_name)
    .bind(date_to_sql(from))
    .bind(date_to_sql(to))
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to find pending income")?;

    row.as_ref().map(row_to_transaction).transpose()
}

/// Whether a transaction in `category_id` is dated in `[from, to]` or carries
/// the given description.
pub async fn installment_exists(
    conn: &mut SqliteConnection,
    owner: UserId,
    category_id: CategoryId,
    from: NaiveDate,
    to: NaiveDate,
    description: &str,
) -> Result<bool> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM transactions
            WHERE owner_id = ? AND category_id = ?
              AND ((date >= ? AND date <= ?) OR description = ?)
        ) AS found
        "#,
    )
    .bind(owner)
    .bind(category_id)
    .bind(date_to_sql(from))
    .bind(date_to_sql(to))
    .bind(description)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to check for existing installment")?;

    Ok(row.get("found"))
}

pub(crate) fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let kind: String = row.get("kind");
    let date: String = row.get("date");
    let due_date: Option<String> = row.get("due_date");

    Ok(Transaction {
        id: row.get("id"),
        owner: row.get("owner_id"),
        category_id: row.get("category_id"),
        account_id: row.get("account_id"),
        kind: EntryKind::from_str(&kind)
            .ok_or_else(|| anyhow!("Invalid transaction kind: {}", kind))?,
        description: row.get("description"),
        amount_cents: row.get("amount_cents"),
        date: date_from_sql(&date)?,
        due_date: optional_date_from_sql(due_date)?,
        paid: row.get("paid"),
        installments: row.get("installments"),
    })
}

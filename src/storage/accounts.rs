use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{Account, AccountId, Cents, UserId};

use super::timestamp_from_sql;

const ACCOUNT_COLUMNS: &str = "id, owner_id, name, opening_balance, balance, created_at";

/// Save a new account. Its running balance starts at the opening balance.
pub async fn insert_account(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
    opening_balance: Cents,
) -> Result<Account> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO accounts (owner_id, name, opening_balance, balance, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(name)
    .bind(opening_balance)
    .bind(opening_balance)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save account")?;

    Ok(Account {
        id: row.get("id"),
        owner,
        name: name.to_string(),
        opening_balance,
        balance: opening_balance,
        created_at,
    })
}

/// Get an account by id regardless of owner (callers check ownership).
pub async fn find_account(conn: &mut SqliteConnection, id: AccountId) -> Result<Option<Account>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE id = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

pub async fn find_owned_account(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: AccountId,
) -> Result<Option<Account>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE id = ? AND owner_id = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch account")?;

    row.as_ref().map(row_to_account).transpose()
}

pub async fn find_account_by_name(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
) -> Result<Option<Account>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE owner_id = ? AND name = ?",
        ACCOUNT_COLUMNS
    ))
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch account by name")?;

    row.as_ref().map(row_to_account).transpose()
}

/// List an owner's accounts by name.
pub async fn list_accounts(conn: &mut SqliteConnection, owner: UserId) -> Result<Vec<Account>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE owner_id = ? ORDER BY name",
        ACCOUNT_COLUMNS
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list accounts")?;

    rows.iter().map(row_to_account).collect()
}

/// List an owner's accounts in creation (id) order.
pub async fn list_accounts_by_id(
    conn: &mut SqliteConnection,
    owner: UserId,
) -> Result<Vec<Account>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM accounts WHERE owner_id = ? ORDER BY id",
        ACCOUNT_COLUMNS
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list accounts")?;

    rows.iter().map(row_to_account).collect()
}

/// Persist name and opening balance. The running balance is written only
/// through [`adjust_balance`] / [`set_balance`].
pub async fn update_account_details(conn: &mut SqliteConnection, account: &Account) -> Result<()> {
    sqlx::query("UPDATE accounts SET name = ?, opening_balance = ? WHERE id = ?")
        .bind(&account.name)
        .bind(account.opening_balance)
        .bind(account.id)
        .execute(&mut *conn)
        .await
        .context("Failed to update account")?;
    Ok(())
}

/// Atomically add `delta` to an account's running balance.
/// Returns false when the account no longer exists.
pub async fn adjust_balance(
    conn: &mut SqliteConnection,
    id: AccountId,
    delta: Cents,
) -> Result<bool> {
    let result = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE id = ?")
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to adjust account balance")?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_balance(conn: &mut SqliteConnection, id: AccountId, balance: Cents) -> Result<()> {
    sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
        .bind(balance)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to set account balance")?;
    Ok(())
}

/// Number of transactions and goals still pointing at an account.
pub async fn count_account_references(
    conn: &mut SqliteConnection,
    id: AccountId,
) -> Result<(i64, i64)> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM transactions WHERE account_id = ?) AS transactions,
            (SELECT COUNT(*) FROM goals WHERE account_id = ?) AS goals
        "#,
    )
    .bind(id)
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to count account references")?;

    Ok((row.get("transactions"), row.get("goals")))
}

pub async fn delete_account(conn: &mut SqliteConnection, id: AccountId) -> Result<()> {
    sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete account")?;
    Ok(())
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let created_at: String = row.get("created_at");
    Ok(Account {
        id: row.get("id"),
        owner: row.get("owner_id"),
        name: row.get("name"),
        opening_balance: row.get("opening_balance"),
        balance: row.get("balance"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{AccountId, Cents, Goal, GoalId, UserId};

use super::{date_to_sql, optional_date_from_sql, timestamp_from_sql};

const GOAL_COLUMNS: &str = "id, owner_id, name, target_cents, account_id, target_date, active, created_at";

pub async fn insert_goal(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
    target_cents: Cents,
    account_id: Option<AccountId>,
    target_date: Option<NaiveDate>,
) -> Result<Goal> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO goals (owner_id, name, target_cents, account_id, target_date, active, created_at)
        VALUES (?, ?, ?, ?, ?, 1, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(name)
    .bind(target_cents)
    .bind(account_id)
    .bind(target_date.map(date_to_sql))
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save goal")?;

    Ok(Goal {
        id: row.get("id"),
        owner,
        name: name.to_string(),
        target_cents,
        account_id,
        target_date,
        active: true,
        created_at,
    })
}

/// Get a goal by id regardless of owner (callers check ownership).
pub async fn find_goal(conn: &mut SqliteConnection, id: GoalId) -> Result<Option<Goal>> {
    let row = sqlx::query(&format!("SELECT {} FROM goals WHERE id = ?", GOAL_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch goal")?;

    row.as_ref().map(row_to_goal).transpose()
}

/// Active goals first, then by target date (undated last), then by id.
pub async fn list_goals(conn: &mut SqliteConnection, owner: UserId) -> Result<Vec<Goal>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM goals WHERE owner_id = ? \
         ORDER BY active DESC, target_date IS NULL, target_date, id",
        GOAL_COLUMNS
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list goals")?;

    rows.iter().map(row_to_goal).collect()
}

pub async fn update_goal(conn: &mut SqliteConnection, goal: &Goal) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE goals
        SET name = ?, target_cents = ?, account_id = ?, target_date = ?, active = ?
        WHERE id = ?
        "#,
    )
    .bind(&goal.name)
    .bind(goal.target_cents)
    .bind(goal.account_id)
    .bind(goal.target_date.map(date_to_sql))
    .bind(goal.active)
    .bind(goal.id)
    .execute(&mut *conn)
    .await
    .context("Failed to update goal")?;
    Ok(())
}

pub async fn delete_goal(conn: &mut SqliteConnection, id: GoalId) -> Result<()> {
    sqlx::query("DELETE FROM goals WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete goal")?;
    Ok(())
}

fn row_to_goal(row: &SqliteRow) -> Result<Goal> {
    let target_date: Option<String> = row.get("target_date");
    let created_at: String = row.get("created_at");
    Ok(Goal {
        id: row.get("id"),
        owner: row.get("owner_id"),
        name: row.get("name"),
        target_cents: row.get("target_cents"),
        account_id: row.get("account_id"),
        target_date: optional_date_from_sql(target_date)?,
        active: row.get("active"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

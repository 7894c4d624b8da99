use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::User;

use super::timestamp_from_sql;

pub async fn insert_user(conn: &mut SqliteConnection, username: &str) -> Result<User> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO users (username, created_at)
        VALUES (?, ?)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save user")?;

    Ok(User {
        id: row.get("id"),
        username: username.to_string(),
        created_at,
    })
}

pub async fn find_user_by_name(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, created_at FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch user by name")?;

    row.as_ref().map(row_to_user).transpose()
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let created_at: String = row.get("created_at");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{
    NewReminder, Notification, NotificationId, Recurrence, Reminder, ReminderId, TransactionId,
    UserId,
};

use super::{date_to_sql, optional_date_from_sql, timestamp_from_sql};

const REMINDER_COLUMNS: &str = "id, owner_id, title, description, remind_on, days_before, \
     recurrence, transaction_id, active, created_at";

const NOTIFICATION_COLUMNS: &str = "id, owner_id, message, transaction_id, link, read, created_at";

// ========================================================================
// Reminders
// ========================================================================

pub async fn insert_reminder(
    conn: &mut SqliteConnection,
    owner: UserId,
    new: &NewReminder,
) -> Result<Reminder> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO reminders
            (owner_id, title, description, remind_on, days_before, recurrence, transaction_id, active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.remind_on.map(date_to_sql))
    .bind(new.days_before)
    .bind(new.recurrence.as_str())
    .bind(new.transaction_id)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save reminder")?;

    Ok(Reminder {
        id: row.get("id"),
        owner,
        title: new.title.clone(),
        description: new.description.clone(),
        remind_on: new.remind_on,
        days_before: new.days_before,
        recurrence: new.recurrence,
        transaction_id: new.transaction_id,
        active: true,
        created_at,
    })
}

pub async fn find_owned_reminder(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: ReminderId,
) -> Result<Option<Reminder>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM reminders WHERE id = ? AND owner_id = ?",
        REMINDER_COLUMNS
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch reminder")?;

    row.as_ref().map(row_to_reminder).transpose()
}

pub async fn list_reminders(conn: &mut SqliteConnection, owner: UserId) -> Result<Vec<Reminder>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM reminders WHERE owner_id = ? \
         ORDER BY remind_on IS NULL, remind_on, id",
        REMINDER_COLUMNS
    ))
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list reminders")?;

    rows.iter().map(row_to_reminder).collect()
}

pub async fn set_reminder_active(
    conn: &mut SqliteConnection,
    id: ReminderId,
    active: bool,
) -> Result<()> {
    sqlx::query("UPDATE reminders SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to update reminder")?;
    Ok(())
}

pub async fn delete_reminder(conn: &mut SqliteConnection, id: ReminderId) -> Result<()> {
    sqlx::query("DELETE FROM reminders WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete reminder")?;
    Ok(())
}

// ========================================================================
// Notifications
// ========================================================================

pub async fn insert_notification(
    conn: &mut SqliteConnection,
    owner: UserId,
    message: &str,
    transaction_id: Option<TransactionId>,
    link: Option<&str>,
) -> Result<Notification> {
    let created_at = Utc::now();
    let row = sqlx::query(
        r#"
        INSERT INTO notifications (owner_id, message, transaction_id, link, read, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(message)
    .bind(transaction_id)
    .bind(link)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save notification")?;

    Ok(Notification {
        id: row.get("id"),
        owner,
        message: message.to_string(),
        transaction_id,
        link: link.map(str::to_string),
        read: false,
        created_at,
    })
}

pub async fn find_owned_notification(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: NotificationId,
) -> Result<Option<Notification>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM notifications WHERE id = ? AND owner_id = ?",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch notification")?;

    row.as_ref().map(row_to_notification).transpose()
}

/// Newest first.
pub async fn list_notifications(
    conn: &mut SqliteConnection,
    owner: UserId,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let mut query = format!(
        "SELECT {} FROM notifications WHERE owner_id = ?",
        NOTIFICATION_COLUMNS
    );
    if unread_only {
        query.push_str(" AND read = 0");
    }
    query.push_str(" ORDER BY created_at DESC, id DESC");

    let rows = sqlx::query(&query)
        .bind(owner)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to list notifications")?;

    rows.iter().map(row_to_notification).collect()
}

pub async fn mark_notification_read(conn: &mut SqliteConnection, id: NotificationId) -> Result<()> {
    sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to mark notification read")?;
    Ok(())
}

pub async fn delete_notification(conn: &mut SqliteConnection, id: NotificationId) -> Result<()> {
    sqlx::query("DELETE FROM notifications WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete notification")?;
    Ok(())
}

/// Clear the weak transaction link on reminders and notifications.
pub async fn detach_transaction(
    conn: &mut SqliteConnection,
    transaction_id: TransactionId,
) -> Result<()> {
    sqlx::query("UPDATE reminders SET transaction_id = NULL WHERE transaction_id = ?")
        .bind(transaction_id)
        .execute(&mut *conn)
        .await
        .context("Failed to detach reminders from transaction")?;
    sqlx::query("UPDATE notifications SET transaction_id = NULL WHERE transaction_id = ?")
        .bind(transaction_id)
        .execute(&mut *conn)
        .await
        .context("Failed to detach notifications from transaction")?;
    Ok(())
}

fn row_to_reminder(row: &SqliteRow) -> Result<Reminder> {
    let remind_on: Option<String> = row.get("remind_on");
    let recurrence: String = row.get("recurrence");
    let created_at: String = row.get("created_at");
    Ok(Reminder {
        id: row.get("id"),
        owner: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        remind_on: optional_date_from_sql(remind_on)?,
        days_before: row.get("days_before"),
        recurrence: Recurrence::from_str(&recurrence)
            .ok_or_else(|| anyhow!("Invalid recurrence: {}", recurrence))?,
        transaction_id: row.get("transaction_id"),
        active: row.get("active"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
    let created_at: String = row.get("created_at");
    Ok(Notification {
        id: row.get("id"),
        owner: row.get("owner_id"),
        message: row.get("message"),
        transaction_id: row.get("transaction_id"),
        link: row.get("link"),
        read: row.get("read"),
        created_at: timestamp_from_sql(&created_at)?,
    })
}

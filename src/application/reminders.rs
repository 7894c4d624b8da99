use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::domain::{
    NewReminder, Notification, NotificationId, Reminder, ReminderId, TransactionId, UserId,
    reminders_due,
};
use crate::storage::{commit, reminders, transactions};

use super::service::owned_transaction;
use super::{AppError, LedgerService};

/// What needs attention today: due reminders and unread notifications.
#[derive(Debug, Clone, Serialize)]
pub struct TodayOverview {
    pub date: NaiveDate,
    pub reminders: Vec<Reminder>,
    pub notifications: Vec<Notification>,
}

impl LedgerService {
    // ========================
    // Reminder operations
    // ========================

    #[tracing::instrument(skip(self))]
    pub async fn create_reminder(
        &self,
        owner: UserId,
        new: NewReminder,
    ) -> Result<Reminder, AppError> {
        if new.title.trim().is_empty() {
            return Err(AppError::Validation(
                "Reminder title must not be empty".to_string(),
            ));
        }
        if new.days_before < 0 {
            return Err(AppError::Validation(format!(
                "days before must not be negative (got {})",
                new.days_before
            )));
        }

        let mut tx = self.repo.begin().await?;
        if let Some(transaction_id) = new.transaction_id {
            owned_transaction(&mut tx, owner, transaction_id).await?;
        }
        let reminder = reminders::insert_reminder(&mut tx, owner, &new).await?;
        commit(tx).await?;

        info!(reminder_id = reminder.id, "Created reminder");
        Ok(reminder)
    }

    pub async fn get_reminder(&self, owner: UserId, id: ReminderId) -> Result<Reminder, AppError> {
        let mut conn = self.repo.acquire().await?;
        reminders::find_owned_reminder(&mut conn, owner, id)
            .await?
            .ok_or(AppError::ReminderNotFound(id))
    }

    pub async fn list_reminders(&self, owner: UserId) -> Result<Vec<Reminder>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(reminders::list_reminders(&mut conn, owner).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_reminder_active(
        &self,
        owner: UserId,
        id: ReminderId,
        active: bool,
    ) -> Result<Reminder, AppError> {
        let mut tx = self.repo.begin().await?;
        let reminder = reminders::find_owned_reminder(&mut tx, owner, id)
            .await?
            .ok_or(AppError::ReminderNotFound(id))?;
        reminders::set_reminder_active(&mut tx, id, active).await?;
        commit(tx).await?;

        info!(reminder_id = id, active, "Updated reminder");
        Ok(Reminder { active, ..reminder })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_reminder(&self, owner: UserId, id: ReminderId) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;
        reminders::find_owned_reminder(&mut tx, owner, id)
            .await?
            .ok_or(AppError::ReminderNotFound(id))?;
        reminders::delete_reminder(&mut tx, id).await?;
        commit(tx).await?;

        info!(reminder_id = id, "Deleted reminder");
        Ok(())
    }

    /// Reminders firing today according to the configured clock.
    pub async fn reminders_due_today(&self, owner: UserId) -> Result<Vec<Reminder>, AppError> {
        let mut conn = self.repo.acquire().await?;
        let all = reminders::list_reminders(&mut conn, owner).await?;

        let mut due_dates: HashMap<TransactionId, NaiveDate> = HashMap::new();
        for transaction_id in all.iter().filter_map(|r| r.transaction_id) {
            if due_dates.contains_key(&transaction_id) {
                continue;
            }
            let transaction =
                transactions::find_owned_transaction(&mut conn, owner, transaction_id).await?;
            if let Some(due_date) = transaction.and_then(|t| t.due_date) {
                due_dates.insert(transaction_id, due_date);
            }
        }

        Ok(reminders_due(
            &all,
            |transaction_id| due_dates.get(&transaction_id).copied(),
            self.today(),
        ))
    }

    /// Due reminders plus unread notifications, newest first.
    pub async fn today_overview(&self, owner: UserId) -> Result<TodayOverview, AppError> {
        let reminders = self.reminders_due_today(owner).await?;
        let notifications = self.list_notifications(owner, true).await?;
        Ok(TodayOverview {
            date: self.today(),
            reminders,
            notifications,
        })
    }

    // ========================
    // Notification operations
    // ========================

    #[tracing::instrument(skip(self))]
    pub async fn create_notification(
        &self,
        owner: UserId,
        message: &str,
        transaction_id: Option<TransactionId>,
        link: Option<&str>,
    ) -> Result<Notification, AppError> {
        if message.trim().is_empty() {
            return Err(AppError::Validation(
                "Notification message must not be empty".to_string(),
            ));
        }

        let mut tx = self.repo.begin().await?;
        if let Some(transaction_id) = transaction_id {
            owned_transaction(&mut tx, owner, transaction_id).await?;
        }
        let notification =
            reminders::insert_notification(&mut tx, owner, message, transaction_id, link).await?;
        commit(tx).await?;

        info!(notification_id = notification.id, "Created notification");
        Ok(notification)
    }

    /// Newest first.
    pub async fn list_notifications(
        &self,
        owner: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(reminders::list_notifications(&mut conn, owner, unread_only).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_notification_read(
        &self,
        owner: UserId,
        id: NotificationId,
    ) -> Result<Notification, AppError> {
        let mut tx = self.repo.begin().await?;
        let notification = reminders::find_owned_notification(&mut tx, owner, id)
            .await?
            .ok_or(AppError::NotificationNotFound(id))?;
        reminders::mark_notification_read(&mut tx, id).await?;
        commit(tx).await?;

        Ok(Notification {
            read: true,
            ..notification
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_notification(
        &self,
        owner: UserId,
        id: NotificationId,
    ) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;
        reminders::find_owned_notification(&mut tx, owner, id)
            .await?
            .ok_or(AppError::NotificationNotFound(id))?;
        reminders::delete_notification(&mut tx, id).await?;
        commit(tx).await?;

        info!(notification_id = id, "Deleted notification");
        Ok(())
    }
}

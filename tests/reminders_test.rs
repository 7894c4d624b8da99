mod common;

use anyhow::Result;
use common::{Household, parse_date, test_service};
use controla::application::AppError;
use controla::domain::{EntryKind, NewReminder, NewTransaction, Recurrence};

fn reminder(title: &str, remind_on: Option<&str>, recurrence: Recurrence) -> NewReminder {
    NewReminder {
        title: title.to_string(),
        description: String::new(),
        remind_on: remind_on.map(parse_date),
        days_before: 0,
        recurrence,
        transaction_id: None,
    }
}

#[tokio::test]
async fn test_reminders_due_today() -> Result<()> {
    // The test clock is frozen at 2025-03-10, a Monday.
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let bill = NewTransaction::new(
        home.groceries.id,
        home.bank.id,
        EntryKind::Expense,
        6000,
        parse_date("2025-03-01"),
    )
    .with_due_date(parse_date("2025-03-13"));
    let bill = service.create_transaction(home.owner, bill).await?;

    let today = service
        .create_reminder(home.owner, reminder("Today", Some("2025-03-10"), Recurrence::None))
        .await?;
    let ahead = service
        .create_reminder(
            home.owner,
            NewReminder {
                days_before: 3,
                transaction_id: Some(bill.id),
                ..reminder("Bill due", None, Recurrence::None)
            },
        )
        .await?;
    let monthly = service
        .create_reminder(
            home.owner,
            reminder("Rent", Some("2025-01-10"), Recurrence::Monthly),
        )
        .await?;
    service
        .create_reminder(home.owner, reminder("Tomorrow", Some("2025-03-11"), Recurrence::None))
        .await?;
    service
        .create_reminder(
            home.owner,
            reminder("Tuesdays", Some("2025-03-04"), Recurrence::Weekly),
        )
        .await?;

    let due = service.reminders_due_today(home.owner).await?;
    let ids: Vec<i64> = due.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![today.id, ahead.id, monthly.id]);

    // Inactive reminders never fire.
    service.set_reminder_active(home.owner, today.id, false).await?;
    let due = service.reminders_due_today(home.owner).await?;
    assert_eq!(due.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_reminder_management() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;
    let other = Household::create_for(&service, "ben").await?;

    let result = service
        .create_reminder(home.owner, reminder("  ", None, Recurrence::None))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = service
        .create_reminder(
            home.owner,
            NewReminder {
                days_before: -1,
                ..reminder("Negative", None, Recurrence::None)
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // Links to other owners' transactions are refused.
    let foreign = other.spend(&service, 1000, "2025-03-01").await?;
    let result = service
        .create_reminder(
            home.owner,
            NewReminder {
                transaction_id: Some(foreign.id),
                ..reminder("Foreign", None, Recurrence::None)
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::TransactionNotFound(_))));

    let created = service
        .create_reminder(home.owner, reminder("Taxes", Some("2025-06-30"), Recurrence::Yearly))
        .await?;
    assert!(created.active);

    let toggled = service
        .set_reminder_active(home.owner, created.id, false)
        .await?;
    assert!(!toggled.active);
    assert!(!service.get_reminder(home.owner, created.id).await?.active);

    let result = service.get_reminder(other.owner, created.id).await;
    assert!(matches!(result, Err(AppError::ReminderNotFound(_))));

    service.delete_reminder(home.owner, created.id).await?;
    assert!(service.list_reminders(home.owner).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_notifications() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let result = service
        .create_notification(home.owner, "", None, None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let first = service
        .create_notification(home.owner, "Stipend received", None, None)
        .await?;
    let second = service
        .create_notification(
            home.owner,
            "Goal reached",
            None,
            Some("/goals/1"),
        )
        .await?;
    assert!(!first.read);
    assert_eq!(second.link.as_deref(), Some("/goals/1"));

    let all = service.list_notifications(home.owner, false).await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);

    let read = service.mark_notification_read(home.owner, first.id).await?;
    assert!(read.read);

    let unread = service.list_notifications(home.owner, true).await?;
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].id, second.id);

    service.delete_notification(home.owner, second.id).await?;
    let result = service.mark_notification_read(home.owner, second.id).await;
    assert!(matches!(result, Err(AppError::NotificationNotFound(_))));
    assert!(service.list_notifications(home.owner, true).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_long_lead_time_is_stored_but_never_fires() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let bill = NewTransaction::new(
        home.groceries.id,
        home.bank.id,
        EntryKind::Expense,
        6000,
        parse_date("2025-03-01"),
    )
    .with_due_date(parse_date("2025-03-13"));
    let bill = service.create_transaction(home.owner, bill).await?;

    let far_ahead = service
        .create_reminder(
            home.owner,
            NewReminder {
                days_before: 1_000_000_000,
                transaction_id: Some(bill.id),
                ..reminder("Far ahead", None, Recurrence::None)
            },
        )
        .await?;
    assert_eq!(far_ahead.days_before, 1_000_000_000);

    let today = service
        .create_reminder(home.owner, reminder("Today", Some("2025-03-10"), Recurrence::None))
        .await?;

    let due = service.reminders_due_today(home.owner).await?;
    let ids: Vec<i64> = due.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![today.id]);

    Ok(())
}

#[tokio::test]
async fn test_today_overview_includes_unread_notifications() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let home = Household::create(&service).await?;

    let overview = service.today_overview(home.owner).await?;
    assert_eq!(overview.date, parse_date("2025-03-10"));
    assert!(overview.reminders.is_empty());
    assert!(overview.notifications.is_empty());

    let due = service
        .create_reminder(home.owner, reminder("Pay rent", Some("2025-03-10"), Recurrence::None))
        .await?;
    let seen = service
        .create_notification(home.owner, "Stipend received", None, None)
        .await?;
    let fresh = service
        .create_notification(home.owner, "Goal reached", None, None)
        .await?;
    service.mark_notification_read(home.owner, seen.id).await?;

    let overview = service.today_overview(home.owner).await?;
    assert_eq!(overview.reminders.len(), 1);
    assert_eq!(overview.reminders[0].id, due.id);
    assert_eq!(overview.notifications.len(), 1);
    assert_eq!(overview.notifications[0].id, fresh.id);

    Ok(())
}

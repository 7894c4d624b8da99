use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{TransactionId, UserId};

pub type ReminderId = i64;
pub type NotificationId = i64;

/// How often a reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
            Recurrence::Monthly => "monthly",
            Recurrence::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Recurrence::None),
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            "yearly" => Some(Recurrence::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub remind_on: Option<NaiveDate>,
    pub days_before: i64,
    pub recurrence: Recurrence,
    /// Weak link: cleared when the transaction is deleted.
    pub transaction_id: Option<TransactionId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: String,
    pub remind_on: Option<NaiveDate>,
    pub days_before: i64,
    pub recurrence: Recurrence,
    pub transaction_id: Option<TransactionId>,
}

impl Reminder {
    /// Fires on its own date, or on a repeat of it for recurring reminders.
    pub fn fires_by_date(&self, today: NaiveDate) -> bool {
        let Some(date) = self.remind_on else {
            return false;
        };
        match self.recurrence {
            Recurrence::None => date == today,
            Recurrence::Daily => true,
            Recurrence::Weekly => date == today || date.weekday() == today.weekday(),
            Recurrence::Monthly => date == today || date.day() == today.day(),
            Recurrence::Yearly => {
                date == today || (date.day() == today.day() && date.month() == today.month())
            }
        }
    }

    /// Fires `days_before` days ahead of the linked transaction's due date.
    ///
    /// A lead time reaching before the calendar's first date never fires.
    pub fn fires_for_due_date(&self, due_date: NaiveDate, today: NaiveDate) -> bool {
        let Ok(days_before) = u64::try_from(self.days_before) else {
            return false;
        };
        due_date.checked_sub_days(Days::new(days_before)) == Some(today)
    }
}

/// Reminders due today, in order: dated today, triggered by a linked due date,
/// then recurring ones. Each reminder appears at most once.
///
/// `due_date_of` maps a linked transaction to its due date, when it has one.
pub fn reminders_due(
    reminders: &[Reminder],
    due_date_of: impl Fn(TransactionId) -> Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<Reminder> {
    let active: Vec<&Reminder> = reminders.iter().filter(|r| r.active).collect();
    let mut due: Vec<Reminder> = Vec::new();
    fn push(reminder: &Reminder, due: &mut Vec<Reminder>) {
        if !due.iter().any(|r| r.id == reminder.id) {
            due.push(reminder.clone());
        }
    }

    for reminder in active.iter().filter(|r| r.remind_on == Some(today)) {
        push(reminder, &mut due);
    }

    for reminder in &active {
        let fires = reminder
            .transaction_id
            .and_then(&due_date_of)
            .is_some_and(|due_date| reminder.fires_for_due_date(due_date, today));
        if fires {
            push(reminder, &mut due);
        }
    }

    for reminder in active
        .iter()
        .filter(|r| r.recurrence != Recurrence::None)
    {
        if reminder.fires_by_date(today) {
            push(reminder, &mut due);
        }
    }

    due
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub owner: UserId,
    pub message: String,
    pub transaction_id: Option<TransactionId>,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reminder(id: ReminderId, remind_on: Option<NaiveDate>, recurrence: Recurrence) -> Reminder {
        Reminder {
            id,
            owner: 1,
            title: format!("reminder {}", id),
            description: String::new(),
            remind_on,
            days_before: 0,
            recurrence,
            transaction_id: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recurrence_roundtrip() {
        for r in [
            Recurrence::None,
            Recurrence::Daily,
            Recurrence::Weekly,
            Recurrence::Monthly,
            Recurrence::Yearly,
        ] {
            assert_eq!(Recurrence::from_str(r.as_str()), Some(r));
        }
    }

    #[test]
    fn test_recurring_matches() {
        let today = day(2025, 3, 14); // Friday
        assert!(reminder(1, Some(day(2025, 1, 3)), Recurrence::Weekly).fires_by_date(today));
        assert!(!reminder(1, Some(day(2025, 1, 4)), Recurrence::Weekly).fires_by_date(today));
        assert!(reminder(1, Some(day(2024, 11, 14)), Recurrence::Monthly).fires_by_date(today));
        assert!(reminder(1, Some(day(2020, 3, 14)), Recurrence::Yearly).fires_by_date(today));
        assert!(!reminder(1, Some(day(2020, 4, 14)), Recurrence::Yearly).fires_by_date(today));
        assert!(reminder(1, Some(day(2000, 1, 1)), Recurrence::Daily).fires_by_date(today));
        assert!(!reminder(1, None, Recurrence::Daily).fires_by_date(today));
    }

    #[test]
    fn test_due_date_trigger() {
        let today = day(2025, 3, 14);
        let mut r = reminder(1, None, Recurrence::None);
        r.days_before = 3;
        r.transaction_id = Some(42);

        let due = reminders_due(&[r.clone()], |_| Some(day(2025, 3, 17)), today);
        assert_eq!(due.len(), 1);

        let due = reminders_due(&[r], |_| Some(day(2025, 3, 18)), today);
        assert!(due.is_empty());
    }

    #[test]
    fn test_huge_lead_time_never_fires() {
        let today = day(2025, 3, 14);
        let mut r = reminder(1, None, Recurrence::None);
        r.transaction_id = Some(42);

        r.days_before = 1_000_000_000;
        assert!(!r.fires_for_due_date(day(2025, 3, 17), today));

        r.days_before = i64::MAX;
        assert!(!r.fires_for_due_date(day(2025, 3, 17), today));

        r.days_before = -1;
        assert!(!r.fires_for_due_date(day(2025, 3, 13), today));
    }

    #[test]
    fn test_due_list_is_deduplicated_and_skips_inactive() {
        let today = day(2025, 3, 14);
        let dated_today = reminder(1, Some(today), Recurrence::Monthly);
        let daily = reminder(2, Some(day(2025, 1, 1)), Recurrence::Daily);
        let mut inactive = reminder(3, Some(today), Recurrence::None);
        inactive.active = false;

        let due = reminders_due(&[daily, dated_today, inactive], |_| None, today);
        let ids: Vec<ReminderId> = due.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}

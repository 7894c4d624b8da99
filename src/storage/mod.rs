mod repository;

pub mod accounts;
pub mod aggregates;
pub mod categories;
pub mod goals;
pub mod incentives;
pub mod profiles;
pub mod reminders;
pub mod transactions;
pub mod users;

pub use repository::*;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// SQL migration for the initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn date_from_sql(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("Invalid date in database: {}", value))
}

pub(crate) fn optional_date_from_sql(value: Option<String>) -> Result<Option<NaiveDate>> {
    value.as_deref().map(date_from_sql).transpose()
}

pub(crate) fn timestamp_from_sql(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid timestamp in database: {}", value))?
        .with_timezone(&Utc))
}

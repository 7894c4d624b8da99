//! Read-only rollups over the ledger. Missing sums come back as zero.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection};

use crate::domain::{Cents, EntryKind, Transaction, UserId};

use super::date_to_sql;
use super::transactions::row_to_transaction;

/// Total and count of postings in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: i64,
    pub total: Cents,
}

/// Optional inclusive date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    fn push_clause(&self, query: &mut String, column: &str) {
        if self.from.is_some() {
            query.push_str(&format!(" AND {} >= ?", column));
        }
        if self.to.is_some() {
            query.push_str(&format!(" AND {} <= ?", column));
        }
    }

    fn bindings(&self) -> Vec<String> {
        self.from
            .into_iter()
            .chain(self.to)
            .map(date_to_sql)
            .collect()
    }
}

/// Sum of paid postings of one kind within a date range.
pub async fn sum_paid(
    conn: &mut SqliteConnection,
    owner: UserId,
    kind: EntryKind,
    range: DateRange,
) -> Result<Cents> {
    let mut query = String::from(
        "SELECT COALESCE(SUM(amount_cents), 0) AS total FROM transactions \
         WHERE owner_id = ? AND kind = ? AND paid = 1",
    );
    range.push_clause(&mut query, "date");

    let mut sql_query = sqlx::query(&query).bind(owner).bind(kind.as_str());
    for value in range.bindings() {
        sql_query = sql_query.bind(value);
    }

    let row = sql_query
        .fetch_one(&mut *conn)
        .await
        .context("Failed to sum transactions")?;
    Ok(row.get("total"))
}

/// Paid totals per category for one kind, largest first.
pub async fn paid_totals_by_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    kind: EntryKind,
    range: DateRange,
) -> Result<Vec<CategoryTotal>> {
    let mut query = String::from(
        r#"
        SELECT c.name AS category, COUNT(*) AS count, COALESCE(SUM(t.amount_cents), 0) AS total
        FROM transactions t
        JOIN categories c ON c.id = t.category_id
        WHERE t.owner_id = ? AND t.kind = ? AND t.paid = 1
        "#,
    );
    range.push_clause(&mut query, "t.date");
    query.push_str(" GROUP BY c.id, c.name ORDER BY total DESC, c.name");

    let mut sql_query = sqlx::query(&query).bind(owner).bind(kind.as_str());
    for value in range.bindings() {
        sql_query = sql_query.bind(value);
    }

    let rows = sql_query
        .fetch_all(&mut *conn)
        .await
        .context("Failed to sum transactions by category")?;

    Ok(rows
        .iter()
        .map(|row| CategoryTotal {
            category: row.get("category"),
            count: row.get("count"),
            total: row.get("total"),
        })
        .collect())
}

/// Sum of postings of one kind and paid state whose category name is one of
/// `names` (case-insensitive), over all dates.
pub async fn sum_in_categories(
    conn: &mut SqliteConnection,
    owner: UserId,
    kind: EntryKind,
    paid: bool,
    names: &[&str],
) -> Result<Cents> {
    if names.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    let query = format!(
        r#"
        SELECT COALESCE(SUM(t.amount_cents), 0) AS total
        FROM transactions t
        JOIN categories c ON c.id = t.category_id
        WHERE t.owner_id = ? AND t.kind = ? AND t.paid = ?
          AND c.name COLLATE NOCASE IN ({})
        "#,
        placeholders
    );

    let mut sql_query = sqlx::query(&query)
        .bind(owner)
        .bind(kind.as_str())
        .bind(paid);
    for name in names {
        sql_query = sql_query.bind(*name);
    }

    let row = sql_query
        .fetch_one(&mut *conn)
        .await
        .context("Failed to sum transactions in categories")?;
    Ok(row.get("total"))
}

/// Most recent transaction whose category is named `category_name` (case-insensitive).
pub async fn latest_in_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    category_name: &str,
) -> Result<Option<Transaction>> {
    let row = sqlx::query(
        r#"
        SELECT t.id, t.owner_id, t.category_id, t.account_id, t.kind, t.description,
               t.amount_cents, t.date, t.due_date, t.paid, t.installments
        FROM transactions t
        JOIN categories c ON c.id = t.category_id
        WHERE t.owner_id = ? AND c.name = ? COLLATE NOCASE
        ORDER BY t.date DESC, t.id DESC
        LIMIT 1
        "#,
    )
    .bind(owner)
    .bind(category_name)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch latest transaction in category")?;

    row.as_ref().map(row_to_transaction).transpose()
}

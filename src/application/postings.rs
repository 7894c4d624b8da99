use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::domain::{
    Account, Cents, EntryKind, MAX_DESCRIPTION_LEN, NewTransaction, Transaction,
    paired_category_name,
};
use crate::storage::categories;

use super::maintainer::post_transaction;

/// The two halves of one money movement between accounts of the same owner.
#[derive(Debug, Clone)]
pub struct PairedPosting {
    pub outflow: Transaction,
    pub inflow: Transaction,
}

/// Move `amount_cents` from `source` to `destination` as a settled expense on
/// the source and a settled income on the destination, both dated `date`.
///
/// Categories `"<label> (Outflow)"` and `"<label> (Inflow)"` are created for
/// the owner when missing. Callers check ownership and amount beforehand.
pub(crate) async fn create_paired_postings(
    conn: &mut SqliteConnection,
    source: &Account,
    destination: &Account,
    amount_cents: Cents,
    label: &str,
    date: NaiveDate,
) -> Result<PairedPosting> {
    let owner = source.owner;

    let outflow_category = categories::get_or_create_category(
        conn,
        owner,
        &paired_category_name(label, EntryKind::Expense),
        EntryKind::Expense,
    )
    .await?;
    let inflow_category = categories::get_or_create_category(
        conn,
        owner,
        &paired_category_name(label, EntryKind::Income),
        EntryKind::Income,
    )
    .await?;

    let outflow = post_transaction(
        conn,
        owner,
        &NewTransaction::new(
            outflow_category.id,
            source.id,
            EntryKind::Expense,
            amount_cents,
            date,
        )
        .with_description(clip(format!("{} to {}", label, destination.name)))
        .settled(),
    )
    .await?;

    let inflow = post_transaction(
        conn,
        owner,
        &NewTransaction::new(
            inflow_category.id,
            destination.id,
            EntryKind::Income,
            amount_cents,
            date,
        )
        .with_description(clip(format!("{} from {}", label, source.name)))
        .settled(),
    )
    .await?;

    Ok(PairedPosting { outflow, inflow })
}

fn clip(description: String) -> String {
    if description.chars().count() <= MAX_DESCRIPTION_LEN {
        description
    } else {
        description.chars().take(MAX_DESCRIPTION_LEN).collect()
    }
}

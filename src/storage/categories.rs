use anyhow::{Context, Result, anyhow};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::{Category, CategoryId, EntryKind, UserId};

pub async fn insert_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
    kind: EntryKind,
) -> Result<Category> {
    let row = sqlx::query(
        r#"
        INSERT INTO categories (owner_id, name, kind)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(owner)
    .bind(name)
    .bind(kind.as_str())
    .fetch_one(&mut *conn)
    .await
    .context("Failed to save category")?;

    Ok(Category {
        id: row.get("id"),
        owner,
        name: name.to_string(),
        kind,
    })
}

/// Get the category `(owner, name)`, creating it with `kind` if missing.
///
/// An existing category keeps its kind. Concurrent creators are resolved by
/// the `(owner_id, name)` unique constraint: the loser's insert is a no-op.
pub async fn get_or_create_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
    kind: EntryKind,
) -> Result<Category> {
    sqlx::query(
        r#"
        INSERT INTO categories (owner_id, name, kind)
        VALUES (?, ?, ?)
        ON CONFLICT (owner_id, name) DO NOTHING
        "#,
    )
    .bind(owner)
    .bind(name)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await
    .context("Failed to provision category")?;

    find_category_by_name(conn, owner, name)
        .await?
        .ok_or_else(|| anyhow!("Category vanished after provisioning: {}", name))
}

pub async fn find_owned_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: CategoryId,
) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, owner_id, name, kind FROM categories WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch category")?;

    row.as_ref().map(row_to_category).transpose()
}

pub async fn find_category_by_name(
    conn: &mut SqliteConnection,
    owner: UserId,
    name: &str,
) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, owner_id, name, kind FROM categories WHERE owner_id = ? AND name = ?",
    )
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch category by name")?;

    row.as_ref().map(row_to_category).transpose()
}

pub async fn list_categories(conn: &mut SqliteConnection, owner: UserId) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        "SELECT id, owner_id, name, kind FROM categories WHERE owner_id = ? ORDER BY name",
    )
    .bind(owner)
    .fetch_all(&mut *conn)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category).collect()
}

pub async fn update_category(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
    sqlx::query("UPDATE categories SET name = ?, kind = ? WHERE id = ?")
        .bind(&category.name)
        .bind(category.kind.as_str())
        .bind(category.id)
        .execute(&mut *conn)
        .await
        .context("Failed to update category")?;
    Ok(())
}

pub async fn count_category_references(conn: &mut SqliteConnection, id: CategoryId) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions WHERE category_id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count category references")?;
    Ok(row.get("count"))
}

pub async fn delete_category(conn: &mut SqliteConnection, id: CategoryId) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category(row: &SqliteRow) -> Result<Category> {
    let kind: String = row.get("kind");
    Ok(Category {
        id: row.get("id"),
        owner: row.get("owner_id"),
        name: row.get("name"),
        kind: EntryKind::from_str(&kind)
            .ok_or_else(|| anyhow!("Invalid category kind: {}", kind))?,
    })
}

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::MIGRATION_001_INITIAL;

/// Handle on the SQLite ledger store.
///
/// Reads go through [`Repository::acquire`]; every write goes through a unit of
/// work opened with [`Repository::begin`], which rolls back unless committed.
/// The query functions in the sibling modules take `&mut SqliteConnection`
/// so they run unchanged on either.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL (e.g. `sqlite:controla.db?mode=rwc`).
    ///
    /// Foreign keys are always enforced: the schema relies on them for
    /// RESTRICT / CASCADE / SET NULL referential actions.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open a unit of work. Dropping it without [`Transaction::commit`] rolls back.
    ///
    /// The write lock is taken up front, so concurrent units of work queue on
    /// `busy_timeout` instead of failing on a read-to-write lock upgrade.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin database transaction")
    }

    /// Borrow a pooled connection for read-only queries.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .context("Failed to acquire database connection")
    }
}

/// Commit a unit of work, attaching context on failure.
pub async fn commit(tx: Transaction<'static, Sqlite>) -> Result<()> {
    tx.commit().await.context("Failed to commit database transaction")
}

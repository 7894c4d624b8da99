use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{
    Account, AccountId, BalanceAdjustment, Category, CategoryId, Cents, EntryKind, NewTransaction,
    ProfileChanges, StudentProfile, Transaction, TransactionChanges, TransactionFilter,
    TransactionId, User, UserId,
};
use crate::settings::IncentiveSettings;
use crate::storage::{Repository, accounts, categories, commit, profiles, transactions, users};

use super::maintainer::{apply_adjustments, post_transaction, repost_transaction, unpost_transaction};
use super::{AppError, Clock, LowestIdAccount, PrincipalAccountPolicy, SystemClock};

/// Application service providing every ledger operation.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// Every entity is scoped to an owner: operations take the caller's `UserId`
/// and never touch rows owned by someone else.
pub struct LedgerService {
    pub(crate) repo: Repository,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) principal: Arc<dyn PrincipalAccountPolicy>,
    pub(crate) incentives: IncentiveSettings,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            principal: Arc::new(LowestIdAccount),
            incentives: IncentiveSettings::default(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_principal_policy(mut self, policy: impl PrincipalAccountPolicy + 'static) -> Self {
        self.principal = Arc::new(policy);
        self
    }

    pub fn with_incentive_settings(mut self, settings: IncentiveSettings) -> Self {
        self.incentives = settings;
        self
    }

    /// Today's date according to the configured clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ========================
    // User operations
    // ========================

    /// Create a user together with a default student profile registered this year.
    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, username: &str) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }

        let mut tx = self.repo.begin().await?;
        if users::find_user_by_name(&mut tx, username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username.to_string()));
        }
        let user = users::insert_user(&mut tx, username).await?;
        profiles::insert_profile(&mut tx, &StudentProfile::new(user.id, self.today().year()))
            .await?;
        commit(tx).await?;

        info!(user_id = user.id, "Created user");
        Ok(user)
    }

    pub async fn find_user(&self, username: &str) -> Result<User, AppError> {
        let mut conn = self.repo.acquire().await?;
        users::find_user_by_name(&mut conn, username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    pub async fn get_profile(&self, owner: UserId) -> Result<StudentProfile, AppError> {
        let mut conn = self.repo.acquire().await?;
        profiles::find_profile(&mut conn, owner)
            .await?
            .ok_or(AppError::ProfileNotFound(owner))
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        owner: UserId,
        changes: ProfileChanges,
    ) -> Result<StudentProfile, AppError> {
        let mut tx = self.repo.begin().await?;
        let current = profiles::find_profile(&mut tx, owner)
            .await?
            .ok_or(AppError::ProfileNotFound(owner))?;
        let updated = changes.apply_to(&current)?;
        if updated != current {
            profiles::update_profile(&mut tx, &updated).await?;
        }
        commit(tx).await?;

        info!(user_id = owner, "Updated student profile");
        Ok(updated)
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account whose running balance starts at `opening_balance`.
    #[tracing::instrument(skip(self))]
    pub async fn create_account(
        &self,
        owner: UserId,
        name: &str,
        opening_balance: Cents,
    ) -> Result<Account, AppError> {
        let name = validate_name(name)?;

        let mut tx = self.repo.begin().await?;
        if accounts::find_account_by_name(&mut tx, owner, name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name.to_string()));
        }
        let account = accounts::insert_account(&mut tx, owner, name, opening_balance).await?;
        commit(tx).await?;

        info!(account_id = account.id, "Created account");
        Ok(account)
    }

    pub async fn get_account(&self, owner: UserId, id: AccountId) -> Result<Account, AppError> {
        let mut conn = self.repo.acquire().await?;
        owned_account(&mut conn, owner, id).await
    }

    pub async fn find_account(&self, owner: UserId, name: &str) -> Result<Account, AppError> {
        let mut conn = self.repo.acquire().await?;
        accounts::find_account_by_name(&mut conn, owner, name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    /// List the owner's accounts by name.
    pub async fn list_accounts(&self, owner: UserId) -> Result<Vec<Account>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(accounts::list_accounts(&mut conn, owner).await?)
    }

    /// Rename an account and/or change its opening balance. A new opening
    /// balance shifts the running balance by the same amount.
    #[tracing::instrument(skip(self))]
    pub async fn update_account(
        &self,
        owner: UserId,
        id: AccountId,
        name: Option<&str>,
        opening_balance: Option<Cents>,
    ) -> Result<Account, AppError> {
        let mut tx = self.repo.begin().await?;
        let mut account = owned_account(&mut tx, owner, id).await?;

        if let Some(name) = name {
            let name = validate_name(name)?;
            if name != account.name {
                if accounts::find_account_by_name(&mut tx, owner, name).await?.is_some() {
                    return Err(AppError::AccountAlreadyExists(name.to_string()));
                }
                account.name = name.to_string();
            }
        }

        let mut delta = 0;
        if let Some(opening_balance) = opening_balance {
            delta = opening_balance - account.opening_balance;
            account.opening_balance = opening_balance;
        }

        accounts::update_account_details(&mut tx, &account).await?;
        if delta != 0 {
            apply_adjustments(
                &mut tx,
                &[BalanceAdjustment {
                    account_id: account.id,
                    delta,
                }],
            )
            .await?;
            account.balance += delta;
        }
        commit(tx).await?;

        info!(account_id = account.id, "Updated account");
        Ok(account)
    }

    /// Delete an account that no transaction or goal refers to.
    #[tracing::instrument(skip(self))]
    pub async fn delete_account(&self, owner: UserId, id: AccountId) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;
        let account = owned_account(&mut tx, owner, id).await?;

        let (transactions, goals) = accounts::count_account_references(&mut tx, id).await?;
        if transactions > 0 || goals > 0 {
            return Err(AppError::AccountInUse {
                name: account.name,
                transactions,
                goals,
            });
        }

        accounts::delete_account(&mut tx, id).await?;
        commit(tx).await?;

        info!(account_id = id, "Deleted account");
        Ok(())
    }

    // ========================
    // Category operations
    // ========================

    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        owner: UserId,
        name: &str,
        kind: EntryKind,
    ) -> Result<Category, AppError> {
        let name = validate_name(name)?;

        let mut tx = self.repo.begin().await?;
        if categories::find_category_by_name(&mut tx, owner, name).await?.is_some() {
            return Err(AppError::CategoryAlreadyExists(name.to_string()));
        }
        let category = categories::insert_category(&mut tx, owner, name, kind).await?;
        commit(tx).await?;

        info!(category_id = category.id, "Created category");
        Ok(category)
    }

    pub async fn get_category(&self, owner: UserId, id: CategoryId) -> Result<Category, AppError> {
        let mut conn = self.repo.acquire().await?;
        owned_category(&mut conn, owner, id).await
    }

    pub async fn find_category(&self, owner: UserId, name: &str) -> Result<Category, AppError> {
        let mut conn = self.repo.acquire().await?;
        categories::find_category_by_name(&mut conn, owner, name)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(name.to_string()))
    }

    pub async fn list_categories(&self, owner: UserId) -> Result<Vec<Category>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(categories::list_categories(&mut conn, owner).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_category(
        &self,
        owner: UserId,
        id: CategoryId,
        name: Option<&str>,
        kind: Option<EntryKind>,
    ) -> Result<Category, AppError> {
        let mut tx = self.repo.begin().await?;
        let mut category = owned_category(&mut tx, owner, id).await?;

        if let Some(name) = name {
            let name = validate_name(name)?;
            if name != category.name {
                if categories::find_category_by_name(&mut tx, owner, name)
                    .await?
                    .is_some()
                {
                    return Err(AppError::CategoryAlreadyExists(name.to_string()));
                }
                category.name = name.to_string();
            }
        }
        if let Some(kind) = kind {
            category.kind = kind;
        }

        categories::update_category(&mut tx, &category).await?;
        commit(tx).await?;

        info!(category_id = category.id, "Updated category");
        Ok(category)
    }

    /// Delete a category that no transaction refers to.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, owner: UserId, id: CategoryId) -> Result<(), AppError> {
        let mut tx = self.repo.begin().await?;
        let category = owned_category(&mut tx, owner, id).await?;

        let transactions = categories::count_category_references(&mut tx, id).await?;
        if transactions > 0 {
            return Err(AppError::CategoryInUse {
                name: category.name,
                transactions,
            });
        }

        categories::delete_category(&mut tx, id).await?;
        commit(tx).await?;

        info!(category_id = id, "Deleted category");
        Ok(())
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a transaction and post its effect on the account balance.
    #[tracing::instrument(skip(self))]
    pub async fn create_transaction(
        &self,
        owner: UserId,
        new: NewTransaction,
    ) -> Result<Transaction, AppError> {
        new.validate()?;

        let mut tx = self.repo.begin().await?;
        owned_category(&mut tx, owner, new.category_id).await?;
        owned_account(&mut tx, owner, new.account_id).await?;
        let transaction = post_transaction(&mut tx, owner, &new).await?;
        commit(tx).await?;

        info!(
            transaction_id = transaction.id,
            account_id = transaction.account_id,
            amount = transaction.amount_cents,
            kind = %transaction.kind,
            "Created transaction"
        );
        Ok(transaction)
    }

    /// Apply partial changes to a transaction. The balance moves by the
    /// difference between the stored posting and the new one.
    #[tracing::instrument(skip(self))]
    pub async fn update_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
        changes: TransactionChanges,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.repo.begin().await?;
        let current = owned_transaction(&mut tx, owner, id).await?;
        let updated = changes.apply_to(&current)?;

        if updated.category_id != current.category_id {
            owned_category(&mut tx, owner, updated.category_id).await?;
        }
        if updated.account_id != current.account_id {
            owned_account(&mut tx, owner, updated.account_id).await?;
        }

        repost_transaction(&mut tx, &current, &updated).await?;
        commit(tx).await?;

        info!(transaction_id = id, "Updated transaction");
        Ok(updated)
    }

    /// Delete a transaction, reversing its effect. A linked incentive is
    /// deleted with it; reminders and notifications lose their link.
    #[tracing::instrument(skip(self))]
    pub async fn delete_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.repo.begin().await?;
        let transaction = owned_transaction(&mut tx, owner, id).await?;
        unpost_transaction(&mut tx, &transaction).await?;
        commit(tx).await?;

        info!(transaction_id = id, "Deleted transaction");
        Ok(transaction)
    }

    pub async fn get_transaction(
        &self,
        owner: UserId,
        id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let mut conn = self.repo.acquire().await?;
        owned_transaction(&mut conn, owner, id).await
    }

    /// List transactions matching `filter`, newest first.
    pub async fn list_transactions(
        &self,
        owner: UserId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(transactions::list_transactions(&mut conn, owner, filter).await?)
    }
}

fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name must not be empty".to_string()));
    }
    Ok(name)
}

pub(crate) async fn owned_account(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: AccountId,
) -> Result<Account, AppError> {
    accounts::find_owned_account(conn, owner, id)
        .await?
        .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
}

pub(crate) async fn owned_category(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: CategoryId,
) -> Result<Category, AppError> {
    categories::find_owned_category(conn, owner, id)
        .await?
        .ok_or_else(|| AppError::CategoryNotFound(id.to_string()))
}

pub(crate) async fn owned_transaction(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: TransactionId,
) -> Result<Transaction, AppError> {
    transactions::find_owned_transaction(conn, owner, id)
        .await?
        .ok_or(AppError::TransactionNotFound(id))
}

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::{
    Cents, Goal, GoalChanges, GoalId, GoalProgress, UserId, goal_account_name, validate_goal,
};
use crate::storage::{accounts, commit, goals};

use super::{AppError, LedgerService};

impl LedgerService {
    // ========================
    // Goal operations
    // ========================

    /// Create a goal together with its dedicated `Savings: <name>` account.
    #[tracing::instrument(skip(self))]
    pub async fn create_goal(
        &self,
        owner: UserId,
        name: &str,
        target_cents: Cents,
        target_date: Option<NaiveDate>,
    ) -> Result<Goal, AppError> {
        validate_goal(name, target_cents)?;
        let name = name.trim();
        let account_name = goal_account_name(name);

        let mut tx = self.repo.begin().await?;
        if accounts::find_account_by_name(&mut tx, owner, &account_name)
            .await?
            .is_some()
        {
            return Err(AppError::AccountAlreadyExists(account_name));
        }
        let account = accounts::insert_account(&mut tx, owner, &account_name, 0).await?;
        let goal = goals::insert_goal(
            &mut tx,
            owner,
            name,
            target_cents,
            Some(account.id),
            target_date,
        )
        .await?;
        commit(tx).await?;

        info!(goal_id = goal.id, account_id = account.id, "Created goal");
        Ok(goal)
    }

    pub async fn get_goal(&self, owner: UserId, id: GoalId) -> Result<Goal, AppError> {
        let mut conn = self.repo.acquire().await?;
        owned_goal(&mut conn, owner, id).await
    }

    /// Active goals first, then by target date.
    pub async fn list_goals(&self, owner: UserId) -> Result<Vec<Goal>, AppError> {
        let mut conn = self.repo.acquire().await?;
        Ok(goals::list_goals(&mut conn, owner).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_goal(
        &self,
        owner: UserId,
        id: GoalId,
        changes: GoalChanges,
    ) -> Result<Goal, AppError> {
        let mut tx = self.repo.begin().await?;
        let current = owned_goal(&mut tx, owner, id).await?;
        let mut updated = changes.apply_to(&current)?;
        updated.name = updated.name.trim().to_string();
        goals::update_goal(&mut tx, &updated).await?;
        commit(tx).await?;

        info!(goal_id = id, "Updated goal");
        Ok(updated)
    }

    /// Delete a goal. Its dedicated account and the money in it are kept.
    #[tracing::instrument(skip(self))]
    pub async fn delete_goal(&self, owner: UserId, id: GoalId) -> Result<Goal, AppError> {
        let mut tx = self.repo.begin().await?;
        let goal = owned_goal(&mut tx, owner, id).await?;
        goals::delete_goal(&mut tx, id).await?;
        commit(tx).await?;

        info!(goal_id = id, "Deleted goal");
        Ok(goal)
    }

    /// Progress of a goal measured by its dedicated account's running balance.
    pub async fn goal_progress(&self, owner: UserId, id: GoalId) -> Result<GoalProgress, AppError> {
        let mut conn = self.repo.acquire().await?;
        let goal = owned_goal(&mut conn, owner, id).await?;
        let current = match goal.account_id {
            Some(account_id) => accounts::find_owned_account(&mut conn, owner, account_id)
                .await?
                .map(|account| account.balance)
                .unwrap_or(0),
            None => 0,
        };
        Ok(GoalProgress::compute(&goal, current))
    }
}

async fn owned_goal(
    conn: &mut SqliteConnection,
    owner: UserId,
    id: GoalId,
) -> Result<Goal, AppError> {
    goals::find_goal(conn, id)
        .await?
        .filter(|goal| goal.owner == owner)
        .ok_or(AppError::GoalNotFound(id))
}

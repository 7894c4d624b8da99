use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents, UserId};

pub type GoalId = i64;

pub const MAX_GOAL_NAME_LEN: usize = 100;

/// A savings target backed by its own dedicated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub owner: UserId,
    pub name: String,
    pub target_cents: Cents,
    pub account_id: Option<AccountId>,
    pub target_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// How far a goal's dedicated account is from the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: GoalId,
    pub name: String,
    pub target_cents: Cents,
    pub current_cents: Cents,
    pub remaining_cents: Cents,
    /// Percentage achieved, rounded to two decimals.
    pub percent: f64,
}

impl GoalProgress {
    pub fn compute(goal: &Goal, current_cents: Cents) -> Self {
        let remaining_cents = (goal.target_cents - current_cents).max(0);
        let percent = if goal.target_cents > 0 {
            let raw = current_cents as f64 / goal.target_cents as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            goal_id: goal.id,
            name: goal.name.clone(),
            target_cents: goal.target_cents,
            current_cents,
            remaining_cents,
            percent,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.remaining_cents == 0
    }
}

/// Partial update of a goal; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalChanges {
    pub name: Option<String>,
    pub target_cents: Option<Cents>,
    pub target_date: Option<Option<NaiveDate>>,
    pub active: Option<bool>,
}

impl GoalChanges {
    pub fn apply_to(&self, current: &Goal) -> Result<Goal, GoalValidationError> {
        let updated = Goal {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            target_cents: self.target_cents.unwrap_or(current.target_cents),
            target_date: self.target_date.unwrap_or(current.target_date),
            active: self.active.unwrap_or(current.active),
            ..current.clone()
        };
        validate_goal(&updated.name, updated.target_cents)?;
        Ok(updated)
    }
}

/// Check a goal's name and target amount.
pub fn validate_goal(name: &str, target_cents: Cents) -> Result<(), GoalValidationError> {
    let length = name.trim().chars().count();
    if length == 0 || length > MAX_GOAL_NAME_LEN {
        return Err(GoalValidationError::InvalidName);
    }
    if target_cents <= 0 {
        return Err(GoalValidationError::NonPositiveTarget(target_cents));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalValidationError {
    InvalidName,
    NonPositiveTarget(Cents),
}

impl std::fmt::Display for GoalValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalValidationError::InvalidName => write!(
                f,
                "goal name must be between 1 and {} characters",
                MAX_GOAL_NAME_LEN
            ),
            GoalValidationError::NonPositiveTarget(target) => {
                write!(f, "goal target must be positive (got {} cents)", target)
            }
        }
    }
}

impl std::error::Error for GoalValidationError {}

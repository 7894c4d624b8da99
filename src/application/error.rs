use thiserror::Error;

use crate::domain::{
    GoalId, GoalValidationError, IncentiveId, NotificationId, ProfileValidationError, ReminderId,
    TransactionId, TransactionValidationError, UserId,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Student profile not found for user {0}")]
    ProfileNotFound(UserId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account '{name}' is in use by {transactions} transaction(s) and {goals} goal(s)")]
    AccountInUse {
        name: String,
        transactions: i64,
        goals: i64,
    },

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Category '{name}' is in use by {transactions} transaction(s)")]
    CategoryInUse { name: String, transactions: i64 },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Goal not found: {0}")]
    GoalNotFound(GoalId),

    #[error("Incentive not found: {0}")]
    IncentiveNotFound(IncentiveId),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(ReminderId),

    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Goal deposit refused: {0}")]
    GoalDeposit(String),

    #[error("Receivable confirmation failed: {0}")]
    ReceivableConfirmation(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<TransactionValidationError> for AppError {
    fn from(err: TransactionValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<GoalValidationError> for AppError {
    fn from(err: GoalValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ProfileValidationError> for AppError {
    fn from(err: ProfileValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

use serde::{Deserialize, Serialize};

use super::UserId;

/// Lowest and highest high-school grade a student can be enrolled in.
pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 3;

pub const MAX_EMAIL_LEN: usize = 254;

/// Per-user enrollment data the incentive scheme is built around.
///
/// Exactly one profile exists per user; it is created with the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    /// Empty until the student fills it in.
    pub email: String,
    pub grade: u8,
    pub registration_year: i32,
    /// Whether the student has finished high school.
    pub completed: bool,
}

impl StudentProfile {
    /// A first-grade, not yet completed profile registered in `registration_year`.
    pub fn new(user_id: UserId, registration_year: i32) -> Self {
        Self {
            user_id,
            email: String::new(),
            grade: MIN_GRADE,
            registration_year,
            completed: false,
        }
    }
}

/// Partial update of a profile; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub grade: Option<u8>,
    pub completed: Option<bool>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.grade.is_none() && self.completed.is_none()
    }

    pub fn apply_to(
        &self,
        current: &StudentProfile,
    ) -> Result<StudentProfile, ProfileValidationError> {
        let updated = StudentProfile {
            email: self
                .email
                .as_deref()
                .map(|email| email.trim().to_string())
                .unwrap_or_else(|| current.email.clone()),
            grade: self.grade.unwrap_or(current.grade),
            completed: self.completed.unwrap_or(current.completed),
            ..current.clone()
        };
        validate_profile(&updated.email, updated.grade)?;
        Ok(updated)
    }
}

/// An empty email is allowed; anything else needs a local part and a domain.
pub fn validate_profile(email: &str, grade: u8) -> Result<(), ProfileValidationError> {
    if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
        return Err(ProfileValidationError::InvalidGrade(grade));
    }
    if !email.is_empty() && !is_plausible_email(email) {
        return Err(ProfileValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    if email.chars().count() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    InvalidEmail(String),
    InvalidGrade(u8),
}

impl std::fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileValidationError::InvalidEmail(email) => {
                write!(f, "invalid email address: '{}'", email)
            }
            ProfileValidationError::InvalidGrade(grade) => write!(
                f,
                "grade must be between {} and {} (got {})",
                MIN_GRADE, MAX_GRADE, grade
            ),
        }
    }
}

impl std::error::Error for ProfileValidationError {}

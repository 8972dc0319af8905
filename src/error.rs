//! Domain error taxonomy
//!
//! Every fallible domain operation returns one of these kinds so callers can
//! tell a bad request apart from a missing record or a storage failure.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum MealError {
    /// Malformed input, e.g. a non-positive quantity
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Daily meal-type limit exceeded
    #[error("Meal policy violation: {0}")]
    PolicyViolation(String),

    #[error("A meal needs at least one food item")]
    EmptyMeal,

    /// Operation called in the wrong builder stage
    #[error("Invalid builder state: {0}")]
    InvalidState(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("No swap suggestion available")]
    NoSuggestion,

    #[error("Repository error: {0}")]
    Repository(#[from] DbError),
}

impl MealError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        MealError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Policy violations include building an empty meal.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, MealError::PolicyViolation(_) | MealError::EmptyMeal)
    }

    /// Only collaborator failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MealError::Repository(_))
    }
}

impl From<rusqlite::Error> for MealError {
    fn from(err: rusqlite::Error) -> Self {
        MealError::Repository(DbError::Sqlite(err))
    }
}

impl From<r2d2::Error> for MealError {
    fn from(err: r2d2::Error) -> Self {
        MealError::Repository(DbError::Connection(err))
    }
}

pub type Result<T> = std::result::Result<T, MealError>;

//! User model
//!
//! Profile data and the user's current goal. Credentials never leave the user
//! repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};
use super::Goal;

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub goal: Option<Goal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Copy of this user with the goal replaced wholesale
    pub fn with_goal(&self, goal: Option<Goal>) -> Self {
        Self {
            goal,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Data for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl NewUser {
    /// Check required fields and return the normalised email
    pub fn validate(&self) -> Result<String> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(MealError::Validation(format!("Invalid email: {}", self.email)));
        }
        if self.display_name.trim().is_empty() {
            return Err(MealError::Validation("Display name is required".to_string()));
        }
        if self.password.len() < 8 {
            return Err(MealError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_normalises_email() {
        let user = NewUser {
            email: " Ada@Example.com ".to_string(),
            display_name: "Ada".to_string(),
            password: "correct horse".to_string(),
        };
        assert_eq!(user.validate().unwrap(), "ada@example.com");
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let user = NewUser {
            email: "ada@example.com".to_string(),
            display_name: "Ada".to_string(),
            password: "short".to_string(),
        };
        assert!(matches!(user.validate(), Err(MealError::Validation(_))));
    }
}

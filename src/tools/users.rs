//! User MCP Tools
//!
//! Registration, sign-in and the per-user nutrition goal.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::{Goal, NewUser, User};
use crate::repository::UserRepository;

/// Response for authenticate_user
#[derive(Debug, Serialize)]
pub struct AuthenticateResponse {
    pub authenticated: bool,
    pub user: Option<User>,
}

/// Response for set_goal
#[derive(Debug, Serialize)]
pub struct SetGoalResponse {
    pub user: User,
    pub previous_goal: Option<Goal>,
    pub goal_description: Option<String>,
}

pub fn register_user(users: &dyn UserRepository, data: NewUser) -> Result<User> {
    users.save(&data)
}

/// A wrong password is a normal negative answer, not an error
pub fn authenticate_user(users: &dyn UserRepository, email: &str, password: &str) -> Result<AuthenticateResponse> {
    let user = users.authenticate(email, password)?;
    Ok(AuthenticateResponse {
        authenticated: user.is_some(),
        user,
    })
}

/// Replace the user's goal; `None` clears it
pub fn set_goal(users: &dyn UserRepository, user_id: i64, goal: Option<Goal>) -> Result<SetGoalResponse> {
    let current = users.get(user_id)?;
    let previous_goal = current.goal;
    let updated = current.with_goal(goal);
    users.update_profile(&updated)?;

    match &goal {
        Some(goal) => info!(user_id, goal = %goal, "goal set"),
        None => info!(user_id, "goal cleared"),
    }
    Ok(SetGoalResponse {
        user: users.get(user_id)?,
        previous_goal,
        goal_description: goal.map(|g| g.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MealError;
    use crate::models::{GoalDirection, GoalPercent, NutrientKind};
    use crate::repository::InMemoryUserRepository;

    fn register(users: &InMemoryUserRepository) -> User {
        register_user(
            users,
            NewUser {
                email: "kim@example.com".to_string(),
                display_name: "Kim".to_string(),
                password: "hunter2hunter2".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_authenticate_reports_outcome() {
        let users = InMemoryUserRepository::new(4);
        register(&users);
        assert!(authenticate_user(&users, "kim@example.com", "hunter2hunter2").unwrap().authenticated);
        let denied = authenticate_user(&users, "kim@example.com", "nope-nope").unwrap();
        assert!(!denied.authenticated);
        assert!(denied.user.is_none());
    }

    #[test]
    fn test_set_goal_replaces_previous() {
        let users = InMemoryUserRepository::new(4);
        let user = register(&users);
        let fibre = Goal::new(NutrientKind::Fibre, GoalDirection::Increase, GoalPercent::Five);
        let sugar = Goal::new(NutrientKind::Sugar, GoalDirection::Decrease, GoalPercent::Twenty);

        set_goal(&users, user.id, Some(fibre)).unwrap();
        let response = set_goal(&users, user.id, Some(sugar)).unwrap();
        assert_eq!(response.previous_goal, Some(fibre));
        assert_eq!(response.user.goal, Some(sugar));
        assert_eq!(response.goal_description.as_deref(), Some("decrease sugar by 20%"));

        assert!(set_goal(&users, user.id, None).unwrap().user.goal.is_none());
        assert!(matches!(set_goal(&users, 404, None), Err(MealError::NotFound { .. })));
    }
}

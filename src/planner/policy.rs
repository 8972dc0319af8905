//! Daily meal-type rules
//!
//! Breakfast, lunch and dinner occur at most once per user per day; snacks
//! are unlimited. Counts come from the meal repository on every check.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{MealError, Result};
use crate::models::MealTypeKind;
use crate::repository::MealRepository;

#[derive(Clone, Copy)]
pub struct DailyMealPolicy<'a> {
    meals: &'a dyn MealRepository,
}

impl<'a> DailyMealPolicy<'a> {
    pub fn new(meals: &'a dyn MealRepository) -> Self {
        Self { meals }
    }

    pub fn can_add(&self, user_id: i64, date: NaiveDate, kind: MealTypeKind) -> Result<bool> {
        if kind.max_per_day().is_none() {
            return Ok(true);
        }
        let logged = self.meals.count_for_type(user_id, kind, date)?;
        Ok(kind.allows_another(logged))
    }

    /// Kinds for which `can_add` holds, in breakfast..snack order
    pub fn available_kinds(&self, user_id: i64, date: NaiveDate) -> Result<Vec<MealTypeKind>> {
        let mut kinds = Vec::with_capacity(MealTypeKind::ALL.len());
        for kind in MealTypeKind::ALL {
            if self.can_add(user_id, date, kind)? {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    /// `PolicyViolation` when another meal of `kind` does not fit
    pub fn ensure_can_add(&self, user_id: i64, date: NaiveDate, kind: MealTypeKind) -> Result<()> {
        if self.can_add(user_id, date, kind)? {
            return Ok(());
        }
        debug!(user_id, %date, %kind, "meal type limit reached");
        Err(MealError::PolicyViolation(format!(
            "{} already logged for {}",
            kind, date
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::food;
    use crate::models::MealShellRegistry;
    use crate::repository::InMemoryMealRepository;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 4).unwrap()
    }

    fn log(repo: &InMemoryMealRepository, kind: MealTypeKind) {
        let mut meal = MealShellRegistry::default().create(kind, 1, today()).unwrap();
        meal.add_food_item(food(1, "Toast", 3.0, 15.0, 1.0), 1.0).unwrap();
        repo.save(&meal, 1).unwrap();
    }

    #[test]
    fn test_fresh_day_allows_every_kind() {
        let repo = InMemoryMealRepository::new();
        let policy = DailyMealPolicy::new(&repo);
        assert_eq!(policy.available_kinds(1, today()).unwrap(), MealTypeKind::ALL.to_vec());
    }

    #[test]
    fn test_breakfast_once_snacks_always() {
        let repo = InMemoryMealRepository::new();
        let policy = DailyMealPolicy::new(&repo);

        log(&repo, MealTypeKind::Breakfast);
        assert!(!policy.can_add(1, today(), MealTypeKind::Breakfast).unwrap());
        assert!(policy.can_add(1, today(), MealTypeKind::Snack).unwrap());

        log(&repo, MealTypeKind::Snack);
        log(&repo, MealTypeKind::Snack);
        assert!(policy.can_add(1, today(), MealTypeKind::Snack).unwrap());

        assert_eq!(
            policy.available_kinds(1, today()).unwrap(),
            vec![MealTypeKind::Lunch, MealTypeKind::Dinner, MealTypeKind::Snack]
        );
    }

    #[test]
    fn test_limits_are_per_user_and_date() {
        let repo = InMemoryMealRepository::new();
        let policy = DailyMealPolicy::new(&repo);
        log(&repo, MealTypeKind::Dinner);

        assert!(policy.can_add(2, today(), MealTypeKind::Dinner).unwrap());
        assert!(policy
            .can_add(1, today().succ_opt().unwrap(), MealTypeKind::Dinner)
            .unwrap());
        assert!(matches!(
            policy.ensure_can_add(1, today(), MealTypeKind::Dinner),
            Err(MealError::PolicyViolation(_))
        ));
    }
}

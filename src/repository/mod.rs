//! Repository collaborators
//!
//! The domain talks to storage only through these traits. Implementations are
//! constructed once at startup and passed in explicitly.

mod memory;

use std::time::Instant;

use chrono::NaiveDate;

use crate::error::{MealError, Result};
use crate::models::{
    FoodItem, GoalDirection, Meal, MealTypeKind, NewFoodItem, NewUser, NutrientKind, User,
};

pub use memory::{InMemoryFoodCatalog, InMemoryMealRepository, InMemoryUserRepository};

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(MealError::Validation(format!(
                "Date range ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Read access to the food catalog
pub trait FoodCatalogRepository {
    /// Load one item; unknown ids are `NotFound`
    fn load_food_item(&self, id: i64) -> Result<FoodItem>;

    /// `(id, description)` for every item, ordered by id
    fn list_food_items(&self) -> Result<Vec<(i64, String)>>;

    fn search_by_name(&self, term: &str) -> Result<Vec<FoodItem>>;

    fn search_by_group(&self, group: &str) -> Result<Vec<FoodItem>>;

    /// Add an item to the catalog
    fn add_food_item(&self, data: NewFoodItem) -> Result<FoodItem>;

    /// Bounded, unordered sample of the catalog
    fn sample(&self, limit: usize) -> Result<Vec<FoodItem>>;

    /// Up to `limit` items ordered by `kind`: highest first for `Increase`,
    /// lowest first for `Decrease`.
    fn top_by_nutrient(
        &self,
        kind: NutrientKind,
        direction: GoalDirection,
        limit: usize,
    ) -> Result<Vec<FoodItem>> {
        let mut items = self.sample(limit)?;
        sort_by_nutrient(&mut items, kind, direction);
        Ok(items)
    }

    /// `top_by_nutrient` bounded by `deadline`; `Ok(None)` when it ran past.
    ///
    /// Backends that can abort a running query should override this. The
    /// default only refuses to start late and discards a late answer.
    fn top_by_nutrient_until(
        &self,
        kind: NutrientKind,
        direction: GoalDirection,
        limit: usize,
        deadline: Instant,
    ) -> Result<Option<Vec<FoodItem>>> {
        if Instant::now() >= deadline {
            return Ok(None);
        }
        let items = self.top_by_nutrient(kind, direction, limit)?;
        Ok((Instant::now() < deadline).then_some(items))
    }
}

/// Stable sort of items by a nutrient in the goal's preferred order
pub fn sort_by_nutrient(items: &mut [FoodItem], kind: NutrientKind, direction: GoalDirection) {
    items.sort_by(|a, b| {
        let (va, vb) = (a.value_of(kind), b.value_of(kind));
        match direction {
            GoalDirection::Increase => vb.total_cmp(&va),
            GoalDirection::Decrease => va.total_cmp(&vb),
        }
    });
}

/// Persistence of logged meals
pub trait MealRepository {
    /// Persist a new meal for `user_id`; returns it with its assigned id
    fn save(&self, meal: &Meal, user_id: i64) -> Result<Meal>;

    /// Replace a saved meal's notes and entries
    fn update(&self, meal: &Meal) -> Result<()>;

    /// Soft-delete; false when no live meal has that id
    fn delete(&self, meal_id: i64) -> Result<bool>;

    fn get(&self, meal_id: i64) -> Result<Meal>;

    /// Live meals in the range, ordered by date then id
    fn meals_for_user(&self, user_id: i64, range: DateRange) -> Result<Vec<Meal>>;

    fn count_for_type(&self, user_id: i64, kind: MealTypeKind, date: NaiveDate) -> Result<u32>;

    /// Food item ids of a meal in entry order
    fn import_meal_food_ids(&self, meal_id: i64) -> Result<Vec<i64>>;

    /// Kinds that still fit the daily limits
    fn available_meal_types(&self, user_id: i64, date: NaiveDate) -> Result<Vec<MealTypeKind>> {
        let mut available = Vec::new();
        for kind in MealTypeKind::ALL {
            if kind.allows_another(self.count_for_type(user_id, kind, date)?) {
                available.push(kind);
            }
        }
        Ok(available)
    }
}

/// Accounts, credentials and the goal stored on each profile
pub trait UserRepository {
    /// `None` for an unknown email or a wrong password
    fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>>;

    fn save(&self, user: &NewUser) -> Result<User>;

    /// Persist display name and goal
    fn update_profile(&self, user: &User) -> Result<()>;

    fn get(&self, user_id: i64) -> Result<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()));
        assert!(DateRange::new(end, start).is_err());
        assert!(DateRange::single_day(start).contains(start));
    }
}

//! In-memory repositories
//!
//! Process-local implementations of the collaborator traits, used for tests
//! and for embedding the domain without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use crate::db::DbError;
use crate::error::{MealError, Result};
use crate::models::{FoodItem, Meal, MealTypeKind, NewFoodItem, NewUser, User};
use super::{DateRange, FoodCatalogRepository, MealRepository, UserRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Food catalog held in a map keyed by id
#[derive(Debug, Default)]
pub struct InMemoryFoodCatalog {
    items: Mutex<BTreeMap<i64, FoodItem>>,
}

impl InMemoryFoodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with items that already carry ids
    pub fn with_items(items: impl IntoIterator<Item = FoodItem>) -> Self {
        let catalog = Self::new();
        {
            let mut map = lock(&catalog.items);
            for item in items {
                map.insert(item.id(), item);
            }
        }
        catalog
    }
}

impl FoodCatalogRepository for InMemoryFoodCatalog {
    fn load_food_item(&self, id: i64) -> Result<FoodItem> {
        lock(&self.items)
            .get(&id)
            .cloned()
            .ok_or_else(|| MealError::not_found("Food item", id))
    }

    fn list_food_items(&self) -> Result<Vec<(i64, String)>> {
        Ok(lock(&self.items)
            .values()
            .map(|item| (item.id(), item.description().to_string()))
            .collect())
    }

    fn search_by_name(&self, term: &str) -> Result<Vec<FoodItem>> {
        let term = term.trim().to_lowercase();
        Ok(lock(&self.items)
            .values()
            .filter(|item| item.name().to_lowercase().contains(&term))
            .cloned()
            .collect())
    }

    fn search_by_group(&self, group: &str) -> Result<Vec<FoodItem>> {
        let group = group.trim().to_lowercase();
        Ok(lock(&self.items)
            .values()
            .filter(|item| item.food_group() == group)
            .cloned()
            .collect())
    }

    fn add_food_item(&self, data: NewFoodItem) -> Result<FoodItem> {
        let mut items = lock(&self.items);
        let id = items.keys().next_back().copied().unwrap_or(0) + 1;
        let item = FoodItem::new(id, data)?;
        items.insert(id, item.clone());
        Ok(item)
    }

    fn sample(&self, limit: usize) -> Result<Vec<FoodItem>> {
        Ok(lock(&self.items).values().take(limit).cloned().collect())
    }
}

#[derive(Debug, Clone)]
struct StoredMeal {
    meal: Meal,
    deleted: bool,
}

/// Meal store with soft deletes
#[derive(Debug, Default)]
pub struct InMemoryMealRepository {
    meals: Mutex<BTreeMap<i64, StoredMeal>>,
}

impl InMemoryMealRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MealRepository for InMemoryMealRepository {
    fn save(&self, meal: &Meal, user_id: i64) -> Result<Meal> {
        if let Some(id) = meal.id() {
            return Err(MealError::Validation(format!(
                "Meal {} is already saved; use update",
                id
            )));
        }
        if meal.is_empty() {
            return Err(MealError::EmptyMeal);
        }
        if meal.user_id() != user_id {
            return Err(MealError::Validation(format!(
                "Meal belongs to user {}, not {}",
                meal.user_id(),
                user_id
            )));
        }
        let mut meals = lock(&self.meals);
        let id = meals.keys().next_back().copied().unwrap_or(0) + 1;
        let owned = meal.clone().with_id(id);
        meals.insert(
            id,
            StoredMeal {
                meal: owned.clone(),
                deleted: false,
            },
        );
        Ok(owned)
    }

    fn update(&self, meal: &Meal) -> Result<()> {
        let id = meal
            .id()
            .ok_or_else(|| MealError::Validation("Cannot update an unsaved meal".to_string()))?;
        if meal.is_empty() {
            return Err(MealError::EmptyMeal);
        }
        let mut meals = lock(&self.meals);
        match meals.get_mut(&id) {
            Some(stored) if !stored.deleted => {
                stored.meal = meal.clone();
                Ok(())
            }
            _ => Err(MealError::not_found("Meal", id)),
        }
    }

    fn delete(&self, meal_id: i64) -> Result<bool> {
        let mut meals = lock(&self.meals);
        match meals.get_mut(&meal_id) {
            Some(stored) if !stored.deleted => {
                stored.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get(&self, meal_id: i64) -> Result<Meal> {
        lock(&self.meals)
            .get(&meal_id)
            .filter(|stored| !stored.deleted)
            .map(|stored| stored.meal.clone())
            .ok_or_else(|| MealError::not_found("Meal", meal_id))
    }

    fn meals_for_user(&self, user_id: i64, range: DateRange) -> Result<Vec<Meal>> {
        let mut meals: Vec<Meal> = lock(&self.meals)
            .values()
            .filter(|s| !s.deleted && s.meal.user_id() == user_id && range.contains(s.meal.date()))
            .map(|s| s.meal.clone())
            .collect();
        meals.sort_by_key(|m| (m.date(), m.id()));
        Ok(meals)
    }

    fn count_for_type(&self, user_id: i64, kind: MealTypeKind, date: NaiveDate) -> Result<u32> {
        let count = lock(&self.meals)
            .values()
            .filter(|s| {
                !s.deleted
                    && s.meal.user_id() == user_id
                    && s.meal.kind() == kind
                    && s.meal.date() == date
            })
            .count();
        Ok(count as u32)
    }

    fn import_meal_food_ids(&self, meal_id: i64) -> Result<Vec<i64>> {
        let meal = MealRepository::get(self, meal_id)?;
        Ok(meal.entries().iter().map(|e| e.food_item.id()).collect())
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

/// User store hashing passwords with bcrypt at a configurable cost
#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: Mutex<BTreeMap<i64, StoredUser>>,
    bcrypt_cost: u32,
}

impl InMemoryUserRepository {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            users: Mutex::new(BTreeMap::new()),
            bcrypt_cost,
        }
    }
}

impl UserRepository for InMemoryUserRepository {
    fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let stored = lock(&self.users)
            .values()
            .find(|s| s.user.email == email)
            .cloned();
        match stored {
            Some(stored) => {
                let ok = bcrypt::verify(password, &stored.password_hash).map_err(DbError::from)?;
                Ok(ok.then_some(stored.user))
            }
            None => Ok(None),
        }
    }

    fn save(&self, user: &NewUser) -> Result<User> {
        let email = user.validate()?;
        let password_hash = bcrypt::hash(&user.password, self.bcrypt_cost).map_err(DbError::from)?;

        let mut users = lock(&self.users);
        if users.values().any(|s| s.user.email == email) {
            return Err(MealError::Validation(format!("Email already registered: {}", email)));
        }
        let id = users.keys().next_back().copied().unwrap_or(0) + 1;
        let now = Utc::now();
        let created = User {
            id,
            email,
            display_name: user.display_name.trim().to_string(),
            goal: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            id,
            StoredUser {
                user: created.clone(),
                password_hash,
            },
        );
        Ok(created)
    }

    fn update_profile(&self, user: &User) -> Result<()> {
        let mut users = lock(&self.users);
        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| MealError::not_found("User", user.id))?;
        stored.user.display_name = user.display_name.clone();
        stored.user.goal = user.goal;
        stored.user.updated_at = Utc::now();
        Ok(())
    }

    fn get(&self, user_id: i64) -> Result<User> {
        lock(&self.users)
            .get(&user_id)
            .map(|s| s.user.clone())
            .ok_or_else(|| MealError::not_found("User", user_id))
    }
}

//! Meal model
//!
//! A meal is an ordered list of (food item, quantity) entries tagged with a
//! meal type. Once built it always holds at least one entry.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{MealError, Result};
use super::{FoodItem, MealTypeKind};

/// A food item and the number of servings eaten
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealEntry {
    pub food_item: FoodItem,
    pub quantity: f64,
}

impl MealEntry {
    pub fn new(food_item: FoodItem, quantity: f64) -> Result<Self> {
        validate_quantity(quantity)?;
        Ok(Self { food_item, quantity })
    }

    /// The food item scaled by this entry's quantity
    pub fn scaled_item(&self) -> Result<FoodItem> {
        self.food_item.scale(self.quantity)
    }
}

pub(crate) fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(MealError::Validation(format!(
            "Quantity must be positive, got {}",
            quantity
        )));
    }
    Ok(())
}

/// Stored state of a meal, as read back by a repository
#[derive(Debug, Clone)]
pub struct MealParts {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub kind: MealTypeKind,
    pub entries: Vec<MealEntry>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A logged or in-progress meal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meal {
    id: Option<i64>,
    user_id: i64,
    date: NaiveDate,
    kind: MealTypeKind,
    entries: Vec<MealEntry>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Meal {
    /// Empty, unsaved meal. Only builders hold a meal in this state.
    pub(crate) fn shell(user_id: i64, date: NaiveDate, kind: MealTypeKind) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id,
            date,
            kind,
            entries: Vec::new(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a persisted meal; stored meals are never empty
    pub fn from_parts(parts: MealParts) -> Result<Self> {
        if parts.entries.is_empty() {
            return Err(MealError::EmptyMeal);
        }
        for entry in &parts.entries {
            validate_quantity(entry.quantity)?;
        }
        Ok(Self {
            id: Some(parts.id),
            user_id: parts.user_id,
            date: parts.date,
            kind: parts.kind,
            entries: parts.entries,
            notes: parts.notes,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Stamp the id assigned by a repository
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> MealTypeKind {
        self.kind
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unscaled food items in entry order
    pub fn food_items(&self) -> Vec<FoodItem> {
        self.entries.iter().map(|e| e.food_item.clone()).collect()
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.touch();
    }

    pub fn add_food_item(&mut self, food_item: FoodItem, quantity: f64) -> Result<()> {
        self.entries.push(MealEntry::new(food_item, quantity)?);
        self.touch();
        Ok(())
    }

    /// Remove the first entry for `food_item_id`.
    ///
    /// A built meal cannot drop its last entry.
    pub fn remove_food_item(&mut self, food_item_id: i64) -> Result<MealEntry> {
        let index = self.position_of(food_item_id)?;
        if self.entries.len() == 1 {
            return Err(MealError::EmptyMeal);
        }
        let removed = self.entries.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Remove without the non-empty check; used while a builder is staging
    pub(crate) fn remove_staged(&mut self, food_item_id: i64) -> Result<MealEntry> {
        let index = self.position_of(food_item_id)?;
        Ok(self.entries.remove(index))
    }

    /// Change the quantity of the first entry for `food_item_id`
    pub fn update_quantity(&mut self, food_item_id: i64, quantity: f64) -> Result<()> {
        validate_quantity(quantity)?;
        let index = self.position_of(food_item_id)?;
        self.entries[index].quantity = quantity;
        self.touch();
        Ok(())
    }

    /// Replace every entry of `original_id` with `replacement`, keeping quantities.
    ///
    /// Returns the number of entries rewritten.
    pub fn replace_food_item(&mut self, original_id: i64, replacement: &FoodItem) -> Result<usize> {
        let mut replacements = BTreeMap::new();
        replacements.insert(original_id, replacement);
        self.replace_food_items(&replacements)
    }

    /// Rewrite entries by original food item id in a single pass.
    ///
    /// Each entry is matched against the meal as it was before the call, so a
    /// replacement that is itself another key is never rewritten again. Every
    /// key must appear in the meal. Returns the number of entries rewritten.
    pub fn replace_food_items(&mut self, replacements: &BTreeMap<i64, &FoodItem>) -> Result<usize> {
        for &original_id in replacements.keys() {
            self.position_of(original_id)?;
        }
        let mut replaced = 0;
        for entry in &mut self.entries {
            if let Some(replacement) = replacements.get(&entry.food_item.id()) {
                entry.food_item = (*replacement).clone();
                replaced += 1;
            }
        }
        if replaced > 0 {
            self.touch();
        }
        Ok(replaced)
    }

    /// Deep copy onto another date as a new, unsaved meal
    pub fn duplicate_for(&self, date: NaiveDate) -> Meal {
        let now = Utc::now();
        Meal {
            id: None,
            user_id: self.user_id,
            date,
            kind: self.kind,
            entries: self.entries.clone(),
            notes: self.notes.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn position_of(&self, food_item_id: i64) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.food_item.id() == food_item_id)
            .ok_or_else(|| MealError::not_found("Meal entry", food_item_id))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Creates the empty meal for a kind
pub type MealConstructor = fn(i64, NaiveDate) -> Meal;

fn breakfast(user_id: i64, date: NaiveDate) -> Meal {
    Meal::shell(user_id, date, MealTypeKind::Breakfast)
}

fn lunch(user_id: i64, date: NaiveDate) -> Meal {
    Meal::shell(user_id, date, MealTypeKind::Lunch)
}

fn dinner(user_id: i64, date: NaiveDate) -> Meal {
    Meal::shell(user_id, date, MealTypeKind::Dinner)
}

fn snack(user_id: i64, date: NaiveDate) -> Meal {
    Meal::shell(user_id, date, MealTypeKind::Snack)
}

/// Maps each meal kind to the function that creates its empty meal
#[derive(Debug, Clone)]
pub struct MealShellRegistry {
    constructors: HashMap<MealTypeKind, MealConstructor>,
}

impl MealShellRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: MealTypeKind, constructor: MealConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn create(&self, kind: MealTypeKind, user_id: i64, date: NaiveDate) -> Result<Meal> {
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| MealError::Validation(format!("No constructor registered for {}", kind)))?;
        let meal = constructor(user_id, date);
        if meal.kind() != kind {
            return Err(MealError::Validation(format!(
                "Constructor for {} produced a {} meal",
                kind,
                meal.kind()
            )));
        }
        Ok(meal)
    }
}

impl Default for MealShellRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(MealTypeKind::Breakfast, breakfast);
        registry.register(MealTypeKind::Lunch, lunch);
        registry.register(MealTypeKind::Dinner, dinner);
        registry.register(MealTypeKind::Snack, snack);
        registry
    }
}

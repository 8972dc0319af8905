//! Meal builder
//!
//! Staged, validating constructor for `Meal`:
//! `Empty -> TypeSelected -> (ItemsStaged)* -> Built`. A builder is single-use;
//! once `build` succeeds every other call fails with `InvalidState`.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MealError, Result};
use crate::models::{FoodItem, Meal, MealEntry, MealShellRegistry, MealTypeKind};
use crate::repository::{FoodCatalogRepository, MealRepository};
use super::DailyMealPolicy;

/// Observable stage of a builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderStage {
    Empty,
    TypeSelected,
    ItemsStaged,
    Built,
}

#[derive(Debug)]
enum State {
    Empty,
    Drafting(Meal),
    Built,
}

pub struct MealBuilder<'a> {
    meals: &'a dyn MealRepository,
    registry: MealShellRegistry,
    user_id: i64,
    date: NaiveDate,
    state: State,
}

impl<'a> MealBuilder<'a> {
    pub fn new(meals: &'a dyn MealRepository, user_id: i64, date: NaiveDate) -> Self {
        Self {
            meals,
            registry: MealShellRegistry::default(),
            user_id,
            date,
            state: State::Empty,
        }
    }

    /// Use a custom kind -> constructor registry
    pub fn with_registry(mut self, registry: MealShellRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn stage(&self) -> BuilderStage {
        match &self.state {
            State::Empty => BuilderStage::Empty,
            State::Drafting(meal) if meal.is_empty() => BuilderStage::TypeSelected,
            State::Drafting(_) => BuilderStage::ItemsStaged,
            State::Built => BuilderStage::Built,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn policy(&self) -> DailyMealPolicy<'a> {
        DailyMealPolicy::new(self.meals)
    }

    /// Select the meal type. Only valid on a fresh builder; a kind that the
    /// daily policy rejects leaves the builder `Empty`.
    pub fn set_meal_type(&mut self, kind: MealTypeKind) -> Result<()> {
        if !matches!(self.state, State::Empty) {
            return Err(MealError::InvalidState(format!(
                "meal type already chosen (stage {:?})",
                self.stage()
            )));
        }
        self.policy().ensure_can_add(self.user_id, self.date, kind)?;
        let shell = self.registry.create(kind, self.user_id, self.date)?;
        debug!(user_id = self.user_id, date = %self.date, %kind, "meal type selected");
        self.state = State::Drafting(shell);
        Ok(())
    }

    fn draft_mut(&mut self) -> Result<&mut Meal> {
        match &mut self.state {
            State::Drafting(meal) => Ok(meal),
            State::Empty => Err(MealError::InvalidState(
                "select a meal type first".to_string(),
            )),
            State::Built => Err(MealError::InvalidState(
                "builder already produced its meal".to_string(),
            )),
        }
    }

    fn draft(&self) -> Result<&Meal> {
        match &self.state {
            State::Drafting(meal) => Ok(meal),
            State::Empty => Err(MealError::InvalidState(
                "select a meal type first".to_string(),
            )),
            State::Built => Err(MealError::InvalidState(
                "builder already produced its meal".to_string(),
            )),
        }
    }

    /// Entries staged so far
    pub fn entries(&self) -> &[MealEntry] {
        match &self.state {
            State::Drafting(meal) => meal.entries(),
            _ => &[],
        }
    }

    pub fn add_food_item(&mut self, item: FoodItem, quantity: f64) -> Result<()> {
        self.draft_mut()?.add_food_item(item, quantity)
    }

    /// Resolve `food_item_id` through the catalog and stage it
    pub fn add_food_by_id(
        &mut self,
        catalog: &dyn FoodCatalogRepository,
        food_item_id: i64,
        quantity: f64,
    ) -> Result<()> {
        self.draft_mut()?;
        let item = catalog.load_food_item(food_item_id)?;
        self.add_food_item(item, quantity)
    }

    /// Remove the first staged entry for `food_item_id`
    pub fn remove_food_item(&mut self, food_item_id: i64) -> Result<MealEntry> {
        self.draft_mut()?.remove_staged(food_item_id)
    }

    pub fn update_quantity(&mut self, food_item_id: i64, quantity: f64) -> Result<()> {
        self.draft_mut()?.update_quantity(food_item_id, quantity)
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> Result<()> {
        self.draft_mut()?.set_notes(notes);
        Ok(())
    }

    /// Stage every food item of a past meal with quantity 1.
    ///
    /// Returns the number of entries added.
    pub fn import_meal(&mut self, catalog: &dyn FoodCatalogRepository, meal_id: i64) -> Result<usize> {
        self.draft_mut()?;
        let ids = self.meals.import_meal_food_ids(meal_id)?;
        let items = ids
            .iter()
            .map(|id| catalog.load_food_item(*id))
            .collect::<Result<Vec<_>>>()?;

        let draft = self.draft_mut()?;
        for item in items {
            draft.add_food_item(item, 1.0)?;
        }
        debug!(meal_id, count = ids.len(), "imported meal items");
        Ok(ids.len())
    }

    /// Finish the meal. The daily policy is checked again because another
    /// meal may have been saved since the type was selected.
    pub fn build(&mut self) -> Result<Meal> {
        let draft = self.draft()?;
        if draft.is_empty() {
            return Err(MealError::EmptyMeal);
        }
        self.policy().ensure_can_add(self.user_id, self.date, draft.kind())?;

        match std::mem::replace(&mut self.state, State::Built) {
            State::Drafting(meal) => {
                info!(
                    user_id = self.user_id,
                    date = %self.date,
                    kind = %meal.kind(),
                    entries = meal.entries().len(),
                    "meal built"
                );
                Ok(meal)
            }
            other => {
                self.state = other;
                Err(MealError::InvalidState("no meal in progress".to_string()))
            }
        }
    }

    /// Detached copy of the in-progress meal dated today.
    ///
    /// Skips the policy check; previews are for comparison views and are
    /// never persisted directly.
    pub fn build_preview(&self) -> Result<Meal> {
        Ok(self.draft()?.duplicate_for(Local::now().date_naive()))
    }
}

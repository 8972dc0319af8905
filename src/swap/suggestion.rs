//! Swap outcomes
//!
//! Transient values produced by the swap engine. Nothing here is persisted
//! unless the caller applies a suggestion to a meal and saves it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::{FoodItem, Goal, GoalDirection, Meal, NutrientKind};
use crate::nutrition::{meal_totals, nutrient_total};
use super::StrategyKind;

/// One proposed food-for-food substitution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapSuggestion {
    pub original: FoodItem,
    pub replacement: FoodItem,
    pub goal: Goal,
    /// Nutrient the replacement was ranked by
    pub nutrient: NutrientKind,
    pub original_value: f64,
    pub replacement_value: f64,
    pub description: String,
}

impl SwapSuggestion {
    pub fn new(original: FoodItem, replacement: FoodItem, goal: Goal, nutrient: NutrientKind) -> Self {
        let original_value = original.value_of(nutrient);
        let replacement_value = replacement.value_of(nutrient);
        let description = describe(&original, &replacement, &goal, nutrient, original_value, replacement_value);
        Self {
            original,
            replacement,
            goal,
            nutrient,
            original_value,
            replacement_value,
            description,
        }
    }

    /// Per-serving change of the ranked nutrient
    pub fn nutrient_change(&self) -> f64 {
        self.replacement_value - self.original_value
    }

    /// Per-serving change in Atwater calories
    pub fn calorie_change(&self) -> f64 {
        self.replacement.calories_from_macros() - self.original.calories_from_macros()
    }

    /// Rewrite the meal's entries; returns how many entries changed
    pub fn apply_to(&self, meal: &mut Meal) -> Result<usize> {
        meal.replace_food_item(self.original.id(), &self.replacement)
    }
}

fn describe(
    original: &FoodItem,
    replacement: &FoodItem,
    goal: &Goal,
    nutrient: NutrientKind,
    from: f64,
    to: f64,
) -> String {
    let verb = if to >= from { "raises" } else { "lowers" };
    let relative = if from > 0.0 {
        format!(" ({:+.0}%)", (to - from) / from * 100.0)
    } else {
        String::new()
    };
    format!(
        "Swapping {} for {} {} {} from {:.1} to {:.1} {} per serving{}, toward your goal to {}",
        original.name(),
        replacement.name(),
        verb,
        nutrient,
        from,
        to,
        nutrient.unit(),
        relative,
        goal
    )
}

/// Outcome of swapping across a whole meal
#[derive(Debug, Clone, Serialize)]
pub struct SwapResult {
    pub strategy: StrategyKind,
    pub goal: Goal,
    pub swaps: Vec<SwapSuggestion>,
    /// Meal total of the goal nutrient before any swap
    pub goal_nutrient_before: f64,
    /// Meal total of the goal nutrient with every swap applied
    pub goal_nutrient_after: f64,
    /// Quantity-weighted calorie change of the whole meal
    pub calorie_change: f64,
    pub goal_met: bool,
}

impl SwapResult {
    /// Evaluate `swaps` against `meal` without modifying it
    pub fn evaluate(meal: &Meal, goal: Goal, strategy: StrategyKind, swaps: Vec<SwapSuggestion>) -> Result<Self> {
        let mut swapped = meal.clone();
        swapped.replace_food_items(&replacement_map(&swaps))?;

        fn entries(meal: &Meal) -> Vec<(&FoodItem, f64)> {
            meal.entries()
                .iter()
                .map(|e| (&e.food_item, e.quantity))
                .collect()
        }
        let before = nutrient_total(entries(meal), goal.nutrient);
        let after = nutrient_total(entries(&swapped), goal.nutrient);
        let calorie_change = meal_totals(&swapped).calories - meal_totals(meal).calories;

        Ok(Self {
            strategy,
            goal,
            goal_met: !swaps.is_empty() && goal.is_met(before, after),
            swaps,
            goal_nutrient_before: before,
            goal_nutrient_after: after,
            calorie_change,
        })
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    /// Apply every swap to `meal` at once; returns the number of entries rewritten.
    ///
    /// Swaps are resolved against the meal's current items, so one swap's
    /// replacement is never picked up by another swap.
    pub fn apply_to(&self, meal: &mut Meal) -> Result<usize> {
        meal.replace_food_items(&replacement_map(&self.swaps))
    }

    /// Whether the meal moved the way the goal asks, even if short of target
    pub fn moves_toward_goal(&self) -> bool {
        match self.goal.direction {
            GoalDirection::Increase => self.goal_nutrient_after > self.goal_nutrient_before,
            GoalDirection::Decrease => self.goal_nutrient_after < self.goal_nutrient_before,
        }
    }
}

/// Original food item id to its replacement; the first swap per original wins
fn replacement_map(swaps: &[SwapSuggestion]) -> BTreeMap<i64, &FoodItem> {
    let mut map = BTreeMap::new();
    for swap in swaps {
        map.entry(swap.original.id()).or_insert(&swap.replacement);
    }
    map
}

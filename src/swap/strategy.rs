//! Swap strategies
//!
//! A strategy decides which of a meal's items should be replaced and which
//! nutrient ranks the replacements. The engine does the catalog search.

use serde::Serialize;

use crate::models::{FoodItem, Goal, GoalDirection, NutrientKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Replace items that score worst for the goal's nutrient
    GoalDirected,
    /// Replace every item under a calorie floor with a richer one
    CalorieFloor,
}

impl StrategyKind {
    /// Strategy used for whole-meal swaps toward `goal`
    pub fn for_goal(goal: &Goal) -> Self {
        match (goal.nutrient, goal.direction) {
            (NutrientKind::Calories, GoalDirection::Increase) => StrategyKind::CalorieFloor,
            _ => StrategyKind::GoalDirected,
        }
    }
}

pub trait SwapStrategy {
    fn kind(&self) -> StrategyKind;

    /// Nutrient and order used to rank replacements
    fn ranking(&self, goal: &Goal) -> (NutrientKind, GoalDirection);

    /// Indexes of the meal items to replace, in meal order
    fn targets(&self, items: &[FoodItem], goal: &Goal) -> Vec<usize>;
}

/// Index of the item with the lowest value for `kind`; the first wins ties
pub fn select_worst_item(items: &[FoodItem], kind: NutrientKind) -> Option<usize> {
    let mut worst: Option<(usize, f64)> = None;
    for (index, item) in items.iter().enumerate() {
        let value = item.value_of(kind);
        match worst {
            Some((_, lowest)) if value >= lowest => {}
            _ => worst = Some((index, value)),
        }
    }
    worst.map(|(index, _)| index)
}

/// General strategy: every item is re-evaluated against the goal
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalDirectedStrategy;

impl SwapStrategy for GoalDirectedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GoalDirected
    }

    fn ranking(&self, goal: &Goal) -> (NutrientKind, GoalDirection) {
        (goal.nutrient, goal.direction)
    }

    fn targets(&self, items: &[FoodItem], _goal: &Goal) -> Vec<usize> {
        (0..items.len()).collect()
    }
}

/// Calorie-increase strategy: items below the floor get a higher-calorie substitute
#[derive(Debug, Clone, Copy)]
pub struct CalorieFloorStrategy {
    pub floor: f64,
}

impl CalorieFloorStrategy {
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }
}

impl SwapStrategy for CalorieFloorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CalorieFloor
    }

    fn ranking(&self, _goal: &Goal) -> (NutrientKind, GoalDirection) {
        (NutrientKind::Calories, GoalDirection::Increase)
    }

    fn targets(&self, items: &[FoodItem], _goal: &Goal) -> Vec<usize> {
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.calories_from_macros() < self.floor)
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::food;
    use crate::models::GoalPercent;

    #[test]
    fn test_worst_item_first_minimum_wins() {
        let items = vec![
            food(1, "Bread", 3.0, 15.0, 1.0),
            food(2, "Apple", 0.3, 14.0, 0.2),
            food(3, "Pear", 0.3, 15.0, 0.1),
        ];
        assert_eq!(select_worst_item(&items, NutrientKind::Protein), Some(1));
        assert_eq!(select_worst_item(&[], NutrientKind::Protein), None);
    }

    #[test]
    fn test_strategy_selection() {
        let more_kcal = Goal::new(NutrientKind::Calories, GoalDirection::Increase, GoalPercent::Ten);
        let less_kcal = Goal::new(NutrientKind::Calories, GoalDirection::Decrease, GoalPercent::Ten);
        let more_fibre = Goal::new(NutrientKind::Fibre, GoalDirection::Increase, GoalPercent::Five);
        assert_eq!(StrategyKind::for_goal(&more_kcal), StrategyKind::CalorieFloor);
        assert_eq!(StrategyKind::for_goal(&less_kcal), StrategyKind::GoalDirected);
        assert_eq!(StrategyKind::for_goal(&more_fibre), StrategyKind::GoalDirected);
    }

    #[test]
    fn test_calorie_floor_targets() {
        let goal = Goal::new(NutrientKind::Calories, GoalDirection::Increase, GoalPercent::Ten);
        let items = vec![
            food(1, "Celery", 0.7, 3.0, 0.2),   // ~16 kcal
            food(2, "Pasta", 13.0, 75.0, 1.5),  // ~365 kcal
            food(3, "Banana", 1.1, 23.0, 0.3),  // ~99 kcal
        ];
        let strategy = CalorieFloorStrategy::new(200.0);
        assert_eq!(strategy.targets(&items, &goal), vec![0, 2]);
        assert_eq!(strategy.ranking(&goal), (NutrientKind::Calories, GoalDirection::Increase));
    }
}

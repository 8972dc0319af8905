//! Data models
//!
//! Domain values shared by the planner, the swap engine, and the repositories.

mod food_item;
mod goal;
mod meal;
mod meal_type;
mod nutrition;
mod user;

#[cfg(test)]
pub(crate) use food_item::test_support;

pub use food_item::{FoodItem, NewFoodItem, NutrientCategory, NutrientProfile};
pub use goal::{Goal, GoalDirection, GoalPercent};
pub use meal::{Meal, MealConstructor, MealEntry, MealParts, MealShellRegistry};
pub use meal_type::{MealTypeKind, MealTypePolicy};
pub use nutrition::{
    atwater_calories, NutrientKind, NutrientTotals, CARBOHYDRATE_KCAL_PER_GRAM,
    FAT_KCAL_PER_GRAM, PROTEIN_KCAL_PER_GRAM,
};
pub use user::{NewUser, User};

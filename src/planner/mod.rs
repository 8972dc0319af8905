//! Meal planning
//!
//! Daily meal-type rules and the staged meal builder.

mod builder;
mod policy;

pub use builder::{BuilderStage, MealBuilder};
pub use policy::DailyMealPolicy;

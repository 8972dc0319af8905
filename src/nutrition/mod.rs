//! Nutrition calculation module
//!
//! Handles nutrient lookup and aggregation over scaled food items.

pub mod aggregator;

pub use aggregator::{
    aggregate, calculate_calories_from_macros, daily_summary, get_nutrient_value, meal_totals,
    nutrient_total, DailySummary, MealTypeShare, TRACKED_NUTRIENTS,
};

//! Meal Swap Library
//!
//! Meal logging with per-day meal-type rules, nutrient totals, and
//! goal-directed food swap suggestions.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod planner;
pub mod repository;
pub mod swap;
pub mod tools;

pub use error::{MealError, Result};

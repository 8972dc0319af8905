//! Meal Swap Tools module
//!
//! Tool implementations behind the MCP server. Each takes the repositories it
//! needs and returns a serializable response.

pub mod food_items;
pub mod meals;
pub mod status;
pub mod swaps;
pub mod users;

use chrono::NaiveDate;

use crate::error::{MealError, Result};

/// Parse an ISO `YYYY-MM-DD` date argument
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| MealError::Validation(format!("Invalid date (expected YYYY-MM-DD): {}", value)))
}

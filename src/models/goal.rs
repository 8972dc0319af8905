//! Nutrition goal model
//!
//! A goal asks to move one nutrient up or down by a fixed percentage. Goals are
//! immutable; updating a user's goal replaces it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};
use super::NutrientKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalDirection {
    Increase,
    Decrease,
}

impl GoalDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalDirection::Increase => "increase",
            GoalDirection::Decrease => "decrease",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "increase" | "up" => Ok(GoalDirection::Increase),
            "decrease" | "down" => Ok(GoalDirection::Decrease),
            other => Err(MealError::Validation(format!("Unknown goal direction: {}", other))),
        }
    }

    /// Whether `candidate` moves the right way from `current`
    pub fn improves(&self, current: f64, candidate: f64) -> bool {
        match self {
            GoalDirection::Increase => candidate > current,
            GoalDirection::Decrease => candidate < current,
        }
    }
}

/// Allowed goal magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GoalPercent {
    Five,
    Ten,
    Fifteen,
    Twenty,
}

impl GoalPercent {
    pub fn value(&self) -> u8 {
        match self {
            GoalPercent::Five => 5,
            GoalPercent::Ten => 10,
            GoalPercent::Fifteen => 15,
            GoalPercent::Twenty => 20,
        }
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.value()) / 100.0
    }
}

impl TryFrom<u8> for GoalPercent {
    type Error = MealError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            5 => Ok(GoalPercent::Five),
            10 => Ok(GoalPercent::Ten),
            15 => Ok(GoalPercent::Fifteen),
            20 => Ok(GoalPercent::Twenty),
            other => Err(MealError::Validation(format!(
                "Goal percent must be 5, 10, 15 or 20, got {}",
                other
            ))),
        }
    }
}

impl From<GoalPercent> for u8 {
    fn from(percent: GoalPercent) -> u8 {
        percent.value()
    }
}

/// A user's nutrition goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub nutrient: NutrientKind,
    pub direction: GoalDirection,
    pub percent: GoalPercent,
}

impl Goal {
    pub fn new(nutrient: NutrientKind, direction: GoalDirection, percent: GoalPercent) -> Self {
        Self {
            nutrient,
            direction,
            percent,
        }
    }

    /// Parse the three parts of a goal from strings and a percent
    pub fn parse(nutrient: &str, direction: &str, percent: u8) -> Result<Self> {
        Ok(Self::new(
            NutrientKind::parse(nutrient)?,
            GoalDirection::parse(direction)?,
            GoalPercent::try_from(percent)?,
        ))
    }

    /// The amount the goal aims for, starting from `current`
    pub fn target_for(&self, current: f64) -> f64 {
        match self.direction {
            GoalDirection::Increase => current * (1.0 + self.percent.fraction()),
            GoalDirection::Decrease => current * (1.0 - self.percent.fraction()),
        }
    }

    /// Whether `after` reaches the goal's target from `before`
    pub fn is_met(&self, before: f64, after: f64) -> bool {
        let target = self.target_for(before);
        match self.direction {
            GoalDirection::Increase => after >= target && after > before,
            GoalDirection::Decrease => after <= target && after < before,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} by {}%",
            self.direction.as_str(),
            self.nutrient,
            self.percent.value()
        )
    }
}

//! Shared nutrition data structures
//!
//! Tracked nutrient kinds and the derived per-meal totals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};

/// kcal per gram of protein
pub const PROTEIN_KCAL_PER_GRAM: f64 = 4.0;
/// kcal per gram of carbohydrate
pub const CARBOHYDRATE_KCAL_PER_GRAM: f64 = 4.0;
/// kcal per gram of fat
pub const FAT_KCAL_PER_GRAM: f64 = 9.0;

/// A nutrient a goal can target or a total can track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientKind {
    Calories,
    Protein,
    Carbohydrate,
    Fat,
    Fibre,
    Sugar,
    Sodium,
}

impl NutrientKind {
    pub const ALL: [NutrientKind; 7] = [
        NutrientKind::Calories,
        NutrientKind::Protein,
        NutrientKind::Carbohydrate,
        NutrientKind::Fat,
        NutrientKind::Fibre,
        NutrientKind::Sugar,
        NutrientKind::Sodium,
    ];

    /// Canonical lookup key in a food item's nutrient maps
    pub fn key(&self) -> &'static str {
        match self {
            NutrientKind::Calories => "calories",
            NutrientKind::Protein => "protein",
            NutrientKind::Carbohydrate => "carbohydrate",
            NutrientKind::Fat => "fat",
            NutrientKind::Fibre => "fibre",
            NutrientKind::Sugar => "sugar",
            NutrientKind::Sodium => "sodium",
        }
    }

    /// Alternative spellings found in heterogeneous food data
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            NutrientKind::Calories => &["kcal", "energy"],
            NutrientKind::Protein => &["proteins"],
            NutrientKind::Carbohydrate => &["carbs", "carbohydrates", "carb"],
            NutrientKind::Fat => &["fats", "total_fat"],
            NutrientKind::Fibre => &["fiber", "dietary_fibre", "dietary_fiber"],
            NutrientKind::Sugar => &["sugars"],
            NutrientKind::Sodium => &["salt_sodium"],
        }
    }

    /// Display unit of the nutrient
    pub fn unit(&self) -> &'static str {
        match self {
            NutrientKind::Calories => "kcal",
            NutrientKind::Sodium => "mg",
            _ => "g",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        NutrientKind::ALL
            .into_iter()
            .find(|kind| kind.key() == normalized || kind.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| MealError::Validation(format!("Unknown nutrient: {}", s)))
    }
}

impl fmt::Display for NutrientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Nutrient totals for a set of scaled food items.
///
/// Always derived from entries, never stored. `calories` is the Atwater value
/// of the summed macros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,      // grams
    pub carbohydrate: f64, // grams
    pub fat: f64,          // grams
    pub fibre: f64,        // grams
}

impl NutrientTotals {
    /// Create totals with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build totals from macros, deriving calories
    pub fn from_macros(protein: f64, carbohydrate: f64, fat: f64, fibre: f64) -> Self {
        Self {
            calories: atwater_calories(protein, carbohydrate, fat),
            protein,
            carbohydrate,
            fat,
            fibre,
        }
    }

    /// Value of a tracked nutrient; untracked kinds are zero
    pub fn get(&self, kind: NutrientKind) -> f64 {
        match kind {
            NutrientKind::Calories => self.calories,
            NutrientKind::Protein => self.protein,
            NutrientKind::Carbohydrate => self.carbohydrate,
            NutrientKind::Fat => self.fat,
            NutrientKind::Fibre => self.fibre,
            NutrientKind::Sugar | NutrientKind::Sodium => 0.0,
        }
    }

    /// Add another set of totals to this one
    pub fn add(&self, other: &NutrientTotals) -> Self {
        Self::from_macros(
            self.protein + other.protein,
            self.carbohydrate + other.carbohydrate,
            self.fat + other.fat,
            self.fibre + other.fibre,
        )
    }
}

impl std::ops::Add for NutrientTotals {
    type Output = NutrientTotals;

    fn add(self, other: NutrientTotals) -> NutrientTotals {
        NutrientTotals::add(&self, &other)
    }
}

impl std::iter::Sum for NutrientTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutrientTotals::zero(), |acc, n| acc + n)
    }
}

/// protein*4 + carbs*4 + fat*9
pub fn atwater_calories(protein: f64, carbohydrate: f64, fat: f64) -> f64 {
    protein * PROTEIN_KCAL_PER_GRAM
        + carbohydrate * CARBOHYDRATE_KCAL_PER_GRAM
        + fat * FAT_KCAL_PER_GRAM
}

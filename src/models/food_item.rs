//! Food Item model
//!
//! An immutable, nutrient-bearing value. Scaling produces a new item.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};
use super::nutrition::{atwater_calories, NutrientKind};

/// Which map of a profile a nutrient lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientCategory {
    Macro,
    Vitamin,
    Mineral,
}

impl NutrientCategory {
    /// Lookup order used by `FoodItem::nutrient_value`
    pub const LOOKUP_ORDER: [NutrientCategory; 3] = [
        NutrientCategory::Macro,
        NutrientCategory::Vitamin,
        NutrientCategory::Mineral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientCategory::Macro => "macro",
            NutrientCategory::Vitamin => "vitamin",
            NutrientCategory::Mineral => "mineral",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "macro" => Some(NutrientCategory::Macro),
            "vitamin" => Some(NutrientCategory::Vitamin),
            "mineral" => Some(NutrientCategory::Mineral),
            _ => None,
        }
    }
}

/// Nutrient amounts per serving, keyed by lowercase name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    #[serde(default)]
    pub macros: BTreeMap<String, f64>,
    #[serde(default)]
    pub vitamins: BTreeMap<String, f64>,
    #[serde(default)]
    pub minerals: BTreeMap<String, f64>,
}

impl NutrientProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile holding the three energy macros
    pub fn with_macros(protein: f64, carbohydrate: f64, fat: f64) -> Self {
        Self::new()
            .with(NutrientCategory::Macro, NutrientKind::Protein.key(), protein)
            .with(NutrientCategory::Macro, NutrientKind::Carbohydrate.key(), carbohydrate)
            .with(NutrientCategory::Macro, NutrientKind::Fat.key(), fat)
    }

    pub fn with(mut self, category: NutrientCategory, name: &str, amount: f64) -> Self {
        self.map_mut(category).insert(name.trim().to_lowercase(), amount);
        self
    }

    pub fn map(&self, category: NutrientCategory) -> &BTreeMap<String, f64> {
        match category {
            NutrientCategory::Macro => &self.macros,
            NutrientCategory::Vitamin => &self.vitamins,
            NutrientCategory::Mineral => &self.minerals,
        }
    }

    fn map_mut(&mut self, category: NutrientCategory) -> &mut BTreeMap<String, f64> {
        match category {
            NutrientCategory::Macro => &mut self.macros,
            NutrientCategory::Vitamin => &mut self.vitamins,
            NutrientCategory::Mineral => &mut self.minerals,
        }
    }

    /// Iterate `(category, name, amount)` over every stored nutrient
    pub fn iter(&self) -> impl Iterator<Item = (NutrientCategory, &str, f64)> + '_ {
        NutrientCategory::LOOKUP_ORDER.into_iter().flat_map(move |category| {
            self.map(category)
                .iter()
                .map(move |(name, amount)| (category, name.as_str(), *amount))
        })
    }

    /// Re-key every map in lowercase and reject negative or non-finite values
    fn normalized(self) -> Result<Self> {
        let mut out = NutrientProfile::new();
        for (category, name, amount) in self.iter() {
            if !amount.is_finite() || amount < 0.0 {
                return Err(MealError::Validation(format!(
                    "Nutrient '{}' must be a non-negative number, got {}",
                    name, amount
                )));
            }
            out = out.with(category, name, amount);
        }
        Ok(out)
    }

    fn scaled(&self, factor: f64) -> Self {
        let scale = |map: &BTreeMap<String, f64>| {
            map.iter()
                .map(|(name, amount)| (name.clone(), amount * factor))
                .collect()
        };
        Self {
            macros: scale(&self.macros),
            vitamins: scale(&self.vitamins),
            minerals: scale(&self.minerals),
        }
    }
}

/// Data for creating a new food item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFoodItem {
    pub name: String,
    pub description: String,
    pub food_group: String,
    pub serving_size: f64,
    pub unit: String,
    /// Label calories, kept for display only
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub nutrients: NutrientProfile,
}

/// A food item with nutritional information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodItem {
    id: i64,
    name: String,
    description: String,
    food_group: String,
    serving_size: f64,
    unit: String,
    calories: Option<f64>,
    nutrients: NutrientProfile,
}

impl FoodItem {
    /// Validate and assemble a catalog item
    pub fn new(id: i64, data: NewFoodItem) -> Result<Self> {
        if data.name.trim().is_empty() {
            return Err(MealError::Validation("Food item name is required".to_string()));
        }
        if !data.serving_size.is_finite() || data.serving_size <= 0.0 {
            return Err(MealError::Validation(format!(
                "Serving size must be positive, got {}",
                data.serving_size
            )));
        }
        if let Some(calories) = data.calories {
            if !calories.is_finite() || calories < 0.0 {
                return Err(MealError::Validation(format!(
                    "Calories must be non-negative, got {}",
                    calories
                )));
            }
        }

        Ok(Self {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            food_group: data.food_group.trim().to_lowercase(),
            serving_size: data.serving_size,
            unit: data.unit,
            calories: data.calories,
            nutrients: data.nutrients.normalized()?,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn food_group(&self) -> &str {
        &self.food_group
    }

    pub fn serving_size(&self) -> f64 {
        self.serving_size
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Label calories as stored; may disagree with `calories_from_macros`
    pub fn stored_calories(&self) -> Option<f64> {
        self.calories
    }

    pub fn nutrients(&self) -> &NutrientProfile {
        &self.nutrients
    }

    /// Look a nutrient up in macros, then vitamins, then minerals.
    ///
    /// Unknown names are zero.
    pub fn nutrient_value(&self, name: &str) -> f64 {
        let key = name.trim().to_lowercase();
        NutrientCategory::LOOKUP_ORDER
            .into_iter()
            .find_map(|category| self.nutrients.map(category).get(&key).copied())
            .unwrap_or(0.0)
    }

    /// Value of a nutrient kind, trying its canonical key then its aliases.
    ///
    /// Calories always come from the Atwater formula.
    pub fn value_of(&self, kind: NutrientKind) -> f64 {
        if kind == NutrientKind::Calories {
            return self.calories_from_macros();
        }
        std::iter::once(kind.key())
            .chain(kind.aliases().iter().copied())
            .find_map(|name| self.lookup(name))
            .unwrap_or(0.0)
    }

    fn lookup(&self, key: &str) -> Option<f64> {
        NutrientCategory::LOOKUP_ORDER
            .into_iter()
            .find_map(|category| self.nutrients.map(category).get(key).copied())
    }

    /// protein*4 + carbs*4 + fat*9, ignoring the stored calorie field
    pub fn calories_from_macros(&self) -> f64 {
        atwater_calories(
            self.value_of(NutrientKind::Protein),
            self.value_of(NutrientKind::Carbohydrate),
            self.value_of(NutrientKind::Fat),
        )
    }

    /// New item with every nutrient multiplied by `factor`
    #[must_use = "scaling returns a new item and leaves this one untouched"]
    pub fn scale(&self, factor: f64) -> Result<FoodItem> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(MealError::Validation(format!(
                "Quantity must be positive, got {}",
                factor
            )));
        }
        Ok(Self {
            nutrients: self.nutrients.scaled(factor),
            calories: self.calories.map(|c| c * factor),
            serving_size: self.serving_size * factor,
            ..self.clone()
        })
    }

    /// One-line summary for logs
    pub fn debug_string(&self) -> String {
        format!(
            "#{} {}: P:{} C:{} F:{} ({} kcal)",
            self.id,
            self.name,
            self.value_of(NutrientKind::Protein),
            self.value_of(NutrientKind::Carbohydrate),
            self.value_of(NutrientKind::Fat),
            self.calories_from_macros()
        )
    }
}

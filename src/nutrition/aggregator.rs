//! Nutrient aggregation
//!
//! Pure functions over immutable food items. Unknown nutrients count as zero
//! so heterogeneous catalog data never fails a total.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{FoodItem, Meal, MealTypeKind, NutrientKind, NutrientTotals};

/// Nutrients summed into `NutrientTotals`; calories are derived from them
pub const TRACKED_NUTRIENTS: [NutrientKind; 4] = [
    NutrientKind::Protein,
    NutrientKind::Carbohydrate,
    NutrientKind::Fat,
    NutrientKind::Fibre,
];

/// Value of a named nutrient, looked up in macros, vitamins, then minerals
pub fn get_nutrient_value(item: &FoodItem, nutrient_name: &str) -> f64 {
    item.nutrient_value(nutrient_name)
}

/// Atwater calories; the stored calorie field is ignored
pub fn calculate_calories_from_macros(item: &FoodItem) -> f64 {
    item.calories_from_macros()
}

/// Sum every tracked nutrient of `item * quantity` over the entries
pub fn aggregate<'a, I>(entries: I) -> NutrientTotals
where
    I: IntoIterator<Item = (&'a FoodItem, f64)>,
{
    let mut sums = [0.0_f64; TRACKED_NUTRIENTS.len()];
    for (item, quantity) in entries {
        for (sum, kind) in sums.iter_mut().zip(TRACKED_NUTRIENTS) {
            *sum += item.value_of(kind) * quantity;
        }
    }
    let [protein, carbohydrate, fat, fibre] = sums;
    NutrientTotals::from_macros(protein, carbohydrate, fat, fibre)
}

/// Totals for a meal's current entries
pub fn meal_totals(meal: &Meal) -> NutrientTotals {
    aggregate(meal.entries().iter().map(|e| (&e.food_item, e.quantity)))
}

/// Total of any nutrient kind over the entries, including untracked ones
pub fn nutrient_total<'a, I>(entries: I, kind: NutrientKind) -> f64
where
    I: IntoIterator<Item = (&'a FoodItem, f64)>,
{
    entries
        .into_iter()
        .map(|(item, quantity)| item.value_of(kind) * quantity)
        .sum()
}

/// How one meal type's calories compare with its recommended share
#[derive(Debug, Clone, Serialize)]
pub struct MealTypeShare {
    pub meal_type: MealTypeKind,
    pub meal_count: usize,
    pub totals: NutrientTotals,
    pub recommended_share: f64,
    pub recommended_calories: f64,
    /// Share of the day's calories actually eaten at this meal type
    pub actual_share: f64,
}

/// Nutrient totals for one day, broken down by meal type
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub daily_calorie_target: f64,
    pub totals: NutrientTotals,
    pub by_meal_type: Vec<MealTypeShare>,
    pub remaining_calories: f64,
}

/// Summarise a day's meals against a daily calorie target
pub fn daily_summary(meals: &[Meal], daily_calorie_target: f64) -> DailySummary {
    let mut grouped: BTreeMap<MealTypeKind, (usize, NutrientTotals)> = BTreeMap::new();
    for meal in meals {
        let slot = grouped
            .entry(meal.kind())
            .or_insert_with(|| (0, NutrientTotals::zero()));
        slot.0 += 1;
        slot.1 = slot.1.add(&meal_totals(meal));
    }

    let totals: NutrientTotals = grouped.values().map(|(_, t)| t.clone()).sum();

    let by_meal_type = MealTypeKind::ALL
        .into_iter()
        .map(|kind| {
            let (meal_count, kind_totals) = grouped
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| (0, NutrientTotals::zero()));
            let actual_share = if totals.calories > 0.0 {
                kind_totals.calories / totals.calories
            } else {
                0.0
            };
            MealTypeShare {
                meal_type: kind,
                meal_count,
                recommended_share: kind.recommended_calorie_share(),
                recommended_calories: kind.recommended_calories(daily_calorie_target),
                actual_share,
                totals: kind_totals,
            }
        })
        .collect();

    DailySummary {
        daily_calorie_target,
        remaining_calories: daily_calorie_target - totals.calories,
        totals,
        by_meal_type,
    }
}

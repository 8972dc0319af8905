//! Meal MCP Tools
//!
//! Logging, editing and summarising meals. Every new meal goes through
//! `MealBuilder`, so the daily meal-type limits apply to all of them.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{MealError, Result};
use crate::models::{Meal, MealTypeKind, NutrientKind, NutrientTotals};
use crate::nutrition::{daily_summary as summarize_day, meal_totals, DailySummary};
use crate::planner::{DailyMealPolicy, MealBuilder};
use crate::repository::{DateRange, FoodCatalogRepository, MealRepository};

/// One `(food item id, quantity)` pair of a meal request
#[derive(Debug, Clone, Copy)]
pub struct MealItemInput {
    pub food_item_id: i64,
    pub quantity: f64,
}

/// Everything needed to log or preview a meal
#[derive(Debug, Clone)]
pub struct LogMealRequest {
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealTypeKind,
    pub items: Vec<MealItemInput>,
    /// Stage every item of this saved meal first, one serving each
    pub import_from: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealItemDetail {
    pub food_item_id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrate: f64,
    pub fat: f64,
    pub fibre: f64,
}

/// Full meal detail response
#[derive(Debug, Serialize)]
pub struct MealDetail {
    pub id: Option<i64>,
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealTypeKind,
    pub notes: Option<String>,
    pub items: Vec<MealItemDetail>,
    pub totals: NutrientTotals,
    pub created_at: String,
    pub updated_at: String,
}

impl MealDetail {
    pub fn from_meal(meal: &Meal) -> Self {
        let items = meal
            .entries()
            .iter()
            .map(|entry| {
                let weighted = |kind: NutrientKind| entry.food_item.value_of(kind) * entry.quantity;
                MealItemDetail {
                    food_item_id: entry.food_item.id(),
                    name: entry.food_item.name().to_string(),
                    quantity: entry.quantity,
                    unit: entry.food_item.unit().to_string(),
                    calories: weighted(NutrientKind::Calories),
                    protein: weighted(NutrientKind::Protein),
                    carbohydrate: weighted(NutrientKind::Carbohydrate),
                    fat: weighted(NutrientKind::Fat),
                    fibre: weighted(NutrientKind::Fibre),
                }
            })
            .collect();
        Self {
            id: meal.id(),
            user_id: meal.user_id(),
            date: meal.date(),
            meal_type: meal.kind(),
            notes: meal.notes().map(str::to_string),
            items,
            totals: meal_totals(meal),
            created_at: meal.created_at().to_rfc3339(),
            updated_at: meal.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealTypeOption {
    pub meal_type: MealTypeKind,
    pub recommended_calories: f64,
}

/// Response for available_meal_types
#[derive(Debug, Serialize)]
pub struct AvailableMealTypesResponse {
    pub user_id: i64,
    pub date: NaiveDate,
    pub available: Vec<MealTypeOption>,
}

/// Response for list_meals
#[derive(Debug, Serialize)]
pub struct ListMealsResponse {
    pub meals: Vec<MealDetail>,
    pub total: usize,
}

/// Response for delete_meal
#[derive(Debug, Serialize)]
pub struct DeleteMealResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Response for daily_summary
#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_count: usize,
    #[serde(flatten)]
    pub summary: DailySummary,
}

pub fn available_meal_types(
    meals: &dyn MealRepository,
    user_id: i64,
    date: NaiveDate,
    daily_calorie_target: f64,
) -> Result<AvailableMealTypesResponse> {
    let available = DailyMealPolicy::new(meals)
        .available_kinds(user_id, date)?
        .into_iter()
        .map(|kind| MealTypeOption {
            meal_type: kind,
            recommended_calories: kind.recommended_calories(daily_calorie_target),
        })
        .collect();
    Ok(AvailableMealTypesResponse {
        user_id,
        date,
        available,
    })
}

fn stage<'a>(
    catalog: &dyn FoodCatalogRepository,
    meals: &'a dyn MealRepository,
    request: &LogMealRequest,
) -> Result<MealBuilder<'a>> {
    let mut builder = MealBuilder::new(meals, request.user_id, request.date);
    builder.set_meal_type(request.meal_type)?;
    if let Some(meal_id) = request.import_from {
        builder.import_meal(catalog, meal_id)?;
    }
    for item in &request.items {
        builder.add_food_by_id(catalog, item.food_item_id, item.quantity)?;
    }
    builder.set_notes(request.notes.clone())?;
    Ok(builder)
}

/// Build and save a meal
pub fn log_meal(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    request: LogMealRequest,
) -> Result<MealDetail> {
    let mut builder = stage(catalog, meals, &request)?;
    let meal = builder.build()?;
    let saved = meals.save(&meal, request.user_id)?;
    Ok(MealDetail::from_meal(&saved))
}

/// Build a meal without saving it or consuming the day's meal-type slot
pub fn preview_meal(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    request: LogMealRequest,
) -> Result<MealDetail> {
    let builder = stage(catalog, meals, &request)?;
    Ok(MealDetail::from_meal(&builder.build_preview()?))
}

/// Copy a saved meal onto another date, subject to that date's limits
pub fn copy_meal(meals: &dyn MealRepository, meal_id: i64, date: NaiveDate) -> Result<MealDetail> {
    let source = meals.get(meal_id)?;
    DailyMealPolicy::new(meals).ensure_can_add(source.user_id(), date, source.kind())?;
    let copy = source.duplicate_for(date);
    let saved = meals.save(&copy, source.user_id())?;
    info!(from = meal_id, to = ?saved.id(), %date, "meal copied");
    Ok(MealDetail::from_meal(&saved))
}

pub fn get_meal(meals: &dyn MealRepository, meal_id: i64) -> Result<MealDetail> {
    Ok(MealDetail::from_meal(&meals.get(meal_id)?))
}

/// Meals of one user between two dates, inclusive
pub fn list_meals(
    meals: &dyn MealRepository,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<ListMealsResponse> {
    let found = meals.meals_for_user(user_id, DateRange::new(start, end)?)?;
    Ok(ListMealsResponse {
        total: found.len(),
        meals: found.iter().map(MealDetail::from_meal).collect(),
    })
}

/// Load, change and save one meal
fn edit_meal<F>(meals: &dyn MealRepository, meal_id: i64, change: F) -> Result<MealDetail>
where
    F: FnOnce(&mut Meal) -> Result<()>,
{
    let mut meal = meals.get(meal_id)?;
    change(&mut meal)?;
    meals.update(&meal)?;
    Ok(MealDetail::from_meal(&meal))
}

pub fn add_meal_item(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    meal_id: i64,
    item: MealItemInput,
) -> Result<MealDetail> {
    let food_item = catalog.load_food_item(item.food_item_id)?;
    edit_meal(meals, meal_id, |meal| meal.add_food_item(food_item, item.quantity))
}

pub fn update_meal_item(meals: &dyn MealRepository, meal_id: i64, item: MealItemInput) -> Result<MealDetail> {
    edit_meal(meals, meal_id, |meal| meal.update_quantity(item.food_item_id, item.quantity))
}

/// Removing the last item is refused; delete the meal instead
pub fn remove_meal_item(meals: &dyn MealRepository, meal_id: i64, food_item_id: i64) -> Result<MealDetail> {
    edit_meal(meals, meal_id, |meal| meal.remove_food_item(food_item_id).map(|_| ()))
}

pub fn delete_meal(meals: &dyn MealRepository, meal_id: i64) -> Result<DeleteMealResponse> {
    if !meals.delete(meal_id)? {
        return Err(MealError::not_found("Meal", meal_id));
    }
    Ok(DeleteMealResponse {
        success: true,
        deleted_id: meal_id,
    })
}

/// Totals for one day against a calorie target
pub fn daily_summary(
    meals: &dyn MealRepository,
    user_id: i64,
    date: NaiveDate,
    daily_calorie_target: f64,
) -> Result<DailySummaryResponse> {
    let day = meals.meals_for_user(user_id, DateRange::single_day(date))?;
    Ok(DailySummaryResponse {
        user_id,
        date,
        meal_count: day.len(),
        summary: summarize_day(&day, daily_calorie_target),
    })
}

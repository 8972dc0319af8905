//! Food Item MCP Tools
//!
//! Catalog lookups and additions.

use serde::Serialize;

use crate::error::Result;
use crate::models::{FoodItem, NewFoodItem, NutrientKind, NutrientProfile};
use crate::repository::FoodCatalogRepository;

const MAX_SEARCH_LIMIT: usize = 100;

/// Summary of a food item for list/search results
#[derive(Debug, Serialize)]
pub struct FoodItemSummary {
    pub id: i64,
    pub name: String,
    pub food_group: String,
    pub serving_size: f64,
    pub unit: String,
    pub calories: f64,
    pub protein: f64,
}

impl From<&FoodItem> for FoodItemSummary {
    fn from(item: &FoodItem) -> Self {
        Self {
            id: item.id(),
            name: item.name().to_string(),
            food_group: item.food_group().to_string(),
            serving_size: item.serving_size(),
            unit: item.unit().to_string(),
            calories: item.calories_from_macros(),
            protein: item.value_of(NutrientKind::Protein),
        }
    }
}

/// Full food item detail response
#[derive(Debug, Serialize)]
pub struct FoodItemDetail {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub food_group: String,
    pub serving_size: f64,
    pub unit: String,
    /// Computed from macros; the value used in every total
    pub calories: f64,
    /// Label value as entered, informational only
    pub label_calories: Option<f64>,
    pub protein: f64,
    pub carbohydrate: f64,
    pub fat: f64,
    pub fibre: f64,
    pub nutrients: NutrientProfile,
}

impl From<&FoodItem> for FoodItemDetail {
    fn from(item: &FoodItem) -> Self {
        Self {
            id: item.id(),
            name: item.name().to_string(),
            description: item.description().to_string(),
            food_group: item.food_group().to_string(),
            serving_size: item.serving_size(),
            unit: item.unit().to_string(),
            calories: item.calories_from_macros(),
            label_calories: item.stored_calories(),
            protein: item.value_of(NutrientKind::Protein),
            carbohydrate: item.value_of(NutrientKind::Carbohydrate),
            fat: item.value_of(NutrientKind::Fat),
            fibre: item.value_of(NutrientKind::Fibre),
            nutrients: item.nutrients().clone(),
        }
    }
}

/// Response for search_food_items and list_food_group
#[derive(Debug, Serialize)]
pub struct SearchFoodItemsResponse {
    pub items: Vec<FoodItemSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub description: String,
}

/// Response for list_food_items
#[derive(Debug, Serialize)]
pub struct ListFoodItemsResponse {
    pub items: Vec<CatalogEntry>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Add a new food item
pub fn add_food_item(catalog: &dyn FoodCatalogRepository, data: NewFoodItem) -> Result<FoodItemDetail> {
    let item = catalog.add_food_item(data)?;
    Ok(FoodItemDetail::from(&item))
}

pub fn get_food_item(catalog: &dyn FoodCatalogRepository, id: i64) -> Result<FoodItemDetail> {
    Ok(FoodItemDetail::from(&catalog.load_food_item(id)?))
}

/// Search food items by name
pub fn search_food_items(
    catalog: &dyn FoodCatalogRepository,
    query: &str,
    limit: usize,
) -> Result<SearchFoodItemsResponse> {
    let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
    let found = catalog.search_by_name(query)?;
    let total = found.len();
    Ok(SearchFoodItemsResponse {
        items: found.iter().take(limit).map(FoodItemSummary::from).collect(),
        total,
    })
}

/// Every item of one food group
pub fn list_food_group(catalog: &dyn FoodCatalogRepository, group: &str) -> Result<SearchFoodItemsResponse> {
    let found = catalog.search_by_group(group)?;
    Ok(SearchFoodItemsResponse {
        total: found.len(),
        items: found.iter().map(FoodItemSummary::from).collect(),
    })
}

/// Page through `(id, description)` pairs ordered by id
pub fn list_food_items(
    catalog: &dyn FoodCatalogRepository,
    limit: usize,
    offset: usize,
) -> Result<ListFoodItemsResponse> {
    let all = catalog.list_food_items()?;
    let total = all.len();
    let items = all
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(id, description)| CatalogEntry { id, description })
        .collect();
    Ok(ListFoodItemsResponse {
        items,
        total,
        limit,
        offset,
    })
}

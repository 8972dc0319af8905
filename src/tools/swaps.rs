//! Swap MCP Tools
//!
//! Goal-directed swap suggestions for saved meals. Suggestions are never
//! persisted; `apply_swap` is the only tool here that writes.

use rand::RngCore;
use serde::Serialize;
use tracing::info;

use crate::error::{MealError, Result};
use crate::models::Goal;
use crate::repository::{FoodCatalogRepository, MealRepository, UserRepository};
use crate::swap::{GoalDirectedSwapEngine, SwapConfig, SwapResult, SwapSuggestion};
use super::meals::MealDetail;

/// Response for suggest_swap
#[derive(Debug, Serialize)]
pub struct SuggestSwapResponse {
    pub meal_id: i64,
    pub goal: Goal,
    pub suggestion: Option<SwapSuggestion>,
    pub message: String,
}

/// Response for suggest_meal_swaps
#[derive(Debug, Serialize)]
pub struct MealSwapsResponse {
    pub meal_id: i64,
    #[serde(flatten)]
    pub result: SwapResult,
    /// The meal as it would look with every swap applied
    pub swapped_meal: MealDetail,
}

/// Response for apply_swap
#[derive(Debug, Serialize)]
pub struct ApplySwapResponse {
    pub entries_replaced: usize,
    pub meal: MealDetail,
}

/// An explicit goal wins; otherwise the meal owner's saved goal
fn resolve_goal(users: &dyn UserRepository, user_id: i64, explicit: Option<Goal>) -> Result<Goal> {
    if let Some(goal) = explicit {
        return Ok(goal);
    }
    users.get(user_id)?.goal.ok_or_else(|| {
        MealError::Validation(format!(
            "User {} has no goal; pass one or call set_goal first",
            user_id
        ))
    })
}

/// Propose one swap for the meal's worst item
pub fn suggest_swap(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    users: &dyn UserRepository,
    config: SwapConfig,
    meal_id: i64,
    goal: Option<Goal>,
    rng: &mut dyn RngCore,
) -> Result<SuggestSwapResponse> {
    let meal = meals.get(meal_id)?;
    let goal = resolve_goal(users, meal.user_id(), goal)?;
    let engine = GoalDirectedSwapEngine::new(catalog, config);
    let suggestion = engine.suggest_swap(&meal.food_items(), &goal, rng)?;

    let message = match &suggestion {
        Some(swap) => swap.description.clone(),
        None => format!("No food in the catalog improves this meal toward your goal to {}", goal),
    };
    Ok(SuggestSwapResponse {
        meal_id,
        goal,
        suggestion,
        message,
    })
}

/// Evaluate swaps for every targeted item of the meal
pub fn suggest_meal_swaps(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    users: &dyn UserRepository,
    config: SwapConfig,
    meal_id: i64,
    goal: Option<Goal>,
    rng: &mut dyn RngCore,
) -> Result<MealSwapsResponse> {
    let meal = meals.get(meal_id)?;
    let goal = resolve_goal(users, meal.user_id(), goal)?;
    let engine = GoalDirectedSwapEngine::new(catalog, config);
    let result = engine.suggest_meal_swaps(&meal, &goal, rng)?;

    let mut swapped = meal.clone();
    result.apply_to(&mut swapped)?;
    Ok(MealSwapsResponse {
        meal_id,
        result,
        swapped_meal: MealDetail::from_meal(&swapped),
    })
}

/// Replace every entry of one food item in a saved meal, keeping quantities
pub fn apply_swap(
    catalog: &dyn FoodCatalogRepository,
    meals: &dyn MealRepository,
    meal_id: i64,
    original_food_item_id: i64,
    replacement_food_item_id: i64,
) -> Result<ApplySwapResponse> {
    if original_food_item_id == replacement_food_item_id {
        return Err(MealError::Validation(
            "Replacement must differ from the original food item".to_string(),
        ));
    }
    let replacement = catalog.load_food_item(replacement_food_item_id)?;
    let mut meal = meals.get(meal_id)?;
    let entries_replaced = meal.replace_food_item(original_food_item_id, &replacement)?;
    meals.update(&meal)?;

    info!(
        meal_id,
        original = original_food_item_id,
        replacement = replacement_food_item_id,
        entries_replaced,
        "swap applied"
    );
    Ok(ApplySwapResponse {
        entries_replaced,
        meal: MealDetail::from_meal(&meal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::food;
    use crate::models::{GoalDirection, GoalPercent, MealTypeKind, NewUser, NutrientKind};
    use crate::repository::{InMemoryFoodCatalog, InMemoryMealRepository, InMemoryUserRepository};
    use crate::tools::meals::{log_meal, LogMealRequest, MealItemInput};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        catalog: InMemoryFoodCatalog,
        meals: InMemoryMealRepository,
        users: InMemoryUserRepository,
        user_id: i64,
        meal_id: i64,
    }

    fn fixture() -> Fixture {
        let catalog = InMemoryFoodCatalog::with_items(vec![
            food(1, "Apple", 0.3, 14.0, 0.2),
            food(2, "Steak", 26.0, 0.0, 15.0),
        ]);
        let meals = InMemoryMealRepository::new();
        let users = InMemoryUserRepository::new(4);
        let user_id = users
            .save(&NewUser {
                email: "lee@example.com".to_string(),
                display_name: "Lee".to_string(),
                password: "long enough".to_string(),
            })
            .unwrap()
            .id;
        let meal_id = log_meal(
            &catalog,
            &meals,
            LogMealRequest {
                user_id,
                date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                meal_type: MealTypeKind::Lunch,
                items: vec![MealItemInput { food_item_id: 1, quantity: 2.0 }],
                import_from: None,
                notes: None,
            },
        )
        .unwrap()
        .id
        .unwrap();
        Fixture {
            catalog,
            meals,
            users,
            user_id,
            meal_id,
        }
    }

    fn protein_up() -> Goal {
        Goal::new(NutrientKind::Protein, GoalDirection::Increase, GoalPercent::Ten)
    }

    #[test]
    fn test_suggest_uses_saved_goal() {
        let f = fixture();
        let mut rng = StdRng::seed_from_u64(42);

        let missing = suggest_swap(&f.catalog, &f.meals, &f.users, SwapConfig::default(), f.meal_id, None, &mut rng);
        assert!(matches!(missing, Err(MealError::Validation(_))));

        let user = f.users.get(f.user_id).unwrap();
        f.users.update_profile(&user.with_goal(Some(protein_up()))).unwrap();
        let response =
            suggest_swap(&f.catalog, &f.meals, &f.users, SwapConfig::default(), f.meal_id, None, &mut rng).unwrap();
        let swap = response.suggestion.unwrap();
        assert_eq!(swap.replacement.name(), "Steak");
        assert_eq!(response.message, swap.description);
    }

    #[test]
    fn test_no_suggestion_is_a_message() {
        let f = fixture();
        let mut rng = StdRng::seed_from_u64(42);
        let less_protein = Goal::new(NutrientKind::Protein, GoalDirection::Decrease, GoalPercent::Five);
        let response = suggest_swap(
            &f.catalog,
            &f.meals,
            &f.users,
            SwapConfig::default(),
            f.meal_id,
            Some(less_protein),
            &mut rng,
        )
        .unwrap();
        assert!(response.suggestion.is_none());
        assert!(response.message.starts_with("No food"));
    }

    #[test]
    fn test_meal_swaps_preview_then_apply() {
        let f = fixture();
        let mut rng = StdRng::seed_from_u64(42);
        let response = suggest_meal_swaps(
            &f.catalog,
            &f.meals,
            &f.users,
            SwapConfig::default(),
            f.meal_id,
            Some(protein_up()),
            &mut rng,
        )
        .unwrap();
        assert_eq!(response.result.swap_count(), 1);
        assert!(response.result.goal_met);
        assert_eq!(response.swapped_meal.items[0].name, "Steak");
        // Suggesting leaves the stored meal alone
        assert_eq!(f.meals.get(f.meal_id).unwrap().entries()[0].food_item.name(), "Apple");

        let applied = apply_swap(&f.catalog, &f.meals, f.meal_id, 1, 2).unwrap();
        assert_eq!(applied.entries_replaced, 1);
        let stored = f.meals.get(f.meal_id).unwrap();
        assert_eq!(stored.entries()[0].food_item.name(), "Steak");
        assert_eq!(stored.entries()[0].quantity, 2.0);

        assert!(matches!(
            apply_swap(&f.catalog, &f.meals, f.meal_id, 1, 2),
            Err(MealError::NotFound { .. })
        ));
    }
}

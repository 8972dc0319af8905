//! End-to-end meal flow against an in-memory SQLite database

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

use mealswap::db::{migrations, Database, SqliteFoodCatalog, SqliteMealRepository, SqliteUserRepository};
use mealswap::models::{
    Goal, GoalDirection, GoalPercent, MealTypeKind, NewFoodItem, NewUser, NutrientCategory,
    NutrientKind, NutrientProfile,
};
use mealswap::repository::{FoodCatalogRepository, MealRepository, UserRepository};
use mealswap::swap::{GoalDirectedSwapEngine, StrategyKind, SwapConfig};
use mealswap::tools::meals::{self, LogMealRequest, MealItemInput};
use mealswap::tools::{swaps, users};
use mealswap::MealError;

struct App {
    catalog: SqliteFoodCatalog,
    meals: SqliteMealRepository,
    users: SqliteUserRepository,
}

fn app() -> App {
    let db = Database::in_memory().unwrap();
    db.with_conn(|conn| migrations::run_migrations(conn)).unwrap();
    App {
        catalog: SqliteFoodCatalog::new(db.clone()),
        meals: SqliteMealRepository::new(db.clone()),
        users: SqliteUserRepository::new(db, 4),
    }
}

fn add(app: &App, name: &str, group: &str, protein: f64, carbs: f64, fat: f64, fibre: f64) -> i64 {
    app.catalog
        .add_food_item(NewFoodItem {
            name: name.to_string(),
            description: name.to_lowercase(),
            food_group: group.to_string(),
            serving_size: 100.0,
            unit: "g".to_string(),
            calories: None,
            nutrients: NutrientProfile::with_macros(protein, carbs, fat)
                .with(NutrientCategory::Macro, "fibre", fibre),
        })
        .unwrap()
        .id()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()
}

fn request(user_id: i64, kind: MealTypeKind, items: &[(i64, f64)]) -> LogMealRequest {
    LogMealRequest {
        user_id,
        date: day(),
        meal_type: kind,
        items: items
            .iter()
            .map(|&(food_item_id, quantity)| MealItemInput { food_item_id, quantity })
            .collect(),
        import_from: None,
        notes: None,
    }
}

#[test]
fn test_log_meals_then_swap_toward_goal() {
    let app = app();
    let apple = add(&app, "Apple", "fruit", 0.3, 14.0, 0.2, 2.4);
    let bread = add(&app, "Bread", "grain", 3.0, 15.0, 1.0, 2.7);
    let steak = add(&app, "Steak", "meat", 26.0, 0.0, 15.0, 0.0);
    add(&app, "Lentils", "legume", 9.0, 20.0, 0.4, 7.9);

    let user = app
        .users
        .save(&NewUser {
            email: "sam@example.com".to_string(),
            display_name: "Sam".to_string(),
            password: "breakfast-club".to_string(),
        })
        .unwrap();
    let goal = Goal::new(NutrientKind::Protein, GoalDirection::Increase, GoalPercent::Twenty);
    users::set_goal(&app.users, user.id, Some(goal)).unwrap();

    let breakfast = meals::log_meal(
        &app.catalog,
        &app.meals,
        request(user.id, MealTypeKind::Breakfast, &[(apple, 1.0), (bread, 2.0)]),
    )
    .unwrap();
    assert!((breakfast.totals.protein - 6.3).abs() < 1e-9);
    assert!((breakfast.totals.calories - 221.0).abs() < 1e-6);

    // A second breakfast is refused; a snack is not
    let again = meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Breakfast, &[(steak, 1.0)]));
    assert!(matches!(again, Err(MealError::PolicyViolation(_))));
    meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Snack, &[(apple, 1.0)])).unwrap();
    meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Snack, &[(bread, 1.0)])).unwrap();

    let meal_id = breakfast.id.unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let suggested = swaps::suggest_swap(
        &app.catalog,
        &app.meals,
        &app.users,
        SwapConfig::default(),
        meal_id,
        None,
        &mut rng,
    )
    .unwrap();
    let swap = suggested.suggestion.unwrap();
    assert_eq!(swap.original.id(), apple);
    assert!(swap.replacement_value > swap.original_value);

    let result = swaps::suggest_meal_swaps(
        &app.catalog,
        &app.meals,
        &app.users,
        SwapConfig::default(),
        meal_id,
        None,
        &mut rng,
    )
    .unwrap();
    assert_eq!(result.result.strategy, StrategyKind::GoalDirected);
    assert!(result.result.moves_toward_goal());

    let applied = swaps::apply_swap(&app.catalog, &app.meals, meal_id, apple, steak).unwrap();
    assert_eq!(applied.entries_replaced, 1);
    let stored = app.meals.get(meal_id).unwrap();
    assert_eq!(stored.entries()[0].food_item.id(), steak);
    assert_eq!(stored.entries()[1].quantity, 2.0);

    let summary = meals::daily_summary(&app.meals, user.id, day(), 2000.0).unwrap();
    assert_eq!(summary.meal_count, 3);
}

#[test]
fn test_deleting_a_meal_frees_its_slot() {
    let app = app();
    let bread = add(&app, "Bread", "grain", 3.0, 15.0, 1.0, 2.7);
    let user = app
        .users
        .save(&NewUser {
            email: "jo@example.com".to_string(),
            display_name: "Jo".to_string(),
            password: "dinner-time".to_string(),
        })
        .unwrap();

    let dinner = meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Dinner, &[(bread, 1.0)]))
        .unwrap();
    assert!(!app
        .meals
        .available_meal_types(user.id, day())
        .unwrap()
        .contains(&MealTypeKind::Dinner));

    meals::delete_meal(&app.meals, dinner.id.unwrap()).unwrap();
    assert!(meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Dinner, &[(bread, 1.0)])).is_ok());
}

#[test]
fn test_calorie_goal_uses_floor_strategy() {
    let app = app();
    let celery = add(&app, "Celery", "vegetable", 0.7, 3.0, 0.2, 1.6);
    add(&app, "Pasta", "grain", 13.0, 75.0, 1.5, 3.2);
    add(&app, "Cheddar", "dairy", 25.0, 1.3, 33.0, 0.0);

    let user = app
        .users
        .save(&NewUser {
            email: "ali@example.com".to_string(),
            display_name: "Ali".to_string(),
            password: "more-energy".to_string(),
        })
        .unwrap();
    let lunch = meals::log_meal(&app.catalog, &app.meals, request(user.id, MealTypeKind::Lunch, &[(celery, 2.0)]))
        .unwrap();

    let meal = app.meals.get(lunch.id.unwrap()).unwrap();
    let goal = Goal::new(NutrientKind::Calories, GoalDirection::Increase, GoalPercent::Ten);
    let engine = GoalDirectedSwapEngine::new(&app.catalog, SwapConfig::default());
    let mut rng = StdRng::seed_from_u64(9);
    let result = engine.suggest_meal_swaps(&meal, &goal, &mut rng).unwrap();

    assert_eq!(result.strategy, StrategyKind::CalorieFloor);
    assert_eq!(result.swap_count(), 1);
    assert!(result.goal_met);
    assert!(result.calorie_change > 0.0);
}

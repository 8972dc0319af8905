//! Goal-directed swap engine
//!
//! Proposes substitutions that move a meal toward a goal:
//! 1. pick the item that scores worst for the goal's nutrient,
//! 2. fetch a bounded candidate pool from the catalog, pre-sorted by that nutrient,
//! 3. drop candidates that do not beat the original in the goal's direction,
//! 4. choose at random among the top K survivors.
//!
//! The catalog search is bounded by a deadline. Running past it is reported as
//! "no suggestion", never as an error.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MealError, Result};
use crate::models::{FoodItem, Goal, GoalDirection, Meal, NutrientKind};
use crate::repository::{sort_by_nutrient, FoodCatalogRepository};
use super::strategy::{select_worst_item, CalorieFloorStrategy, GoalDirectedStrategy, SwapStrategy};
use super::{StrategyKind, SwapResult, SwapSuggestion};

/// Default number of catalog items fetched per search
pub const DEFAULT_SAMPLE_SIZE: usize = 100;
/// Default number of best candidates the random pick draws from
pub const DEFAULT_TOP_K: usize = 5;
/// Default kcal floor for the calorie-increase strategy
pub const DEFAULT_CALORIE_FLOOR: f64 = 200.0;
/// Default bound on one candidate search
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_millis(2000);

/// Deadline checks happen once per this many candidates
const DEADLINE_CHECK_INTERVAL: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwapConfig {
    pub sample_size: usize,
    pub top_k: usize,
    pub calorie_floor: f64,
    #[serde(with = "duration_millis")]
    pub search_timeout: Duration,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            top_k: DEFAULT_TOP_K,
            calorie_floor: DEFAULT_CALORIE_FLOOR,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

pub struct GoalDirectedSwapEngine<'a> {
    catalog: &'a dyn FoodCatalogRepository,
    config: SwapConfig,
    goal_directed: GoalDirectedStrategy,
    calorie_floor: CalorieFloorStrategy,
}

impl<'a> GoalDirectedSwapEngine<'a> {
    pub fn new(catalog: &'a dyn FoodCatalogRepository, config: SwapConfig) -> Self {
        Self {
            catalog,
            config,
            goal_directed: GoalDirectedStrategy,
            calorie_floor: CalorieFloorStrategy::new(config.calorie_floor),
        }
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    fn strategy(&self, kind: StrategyKind) -> &dyn SwapStrategy {
        match kind {
            StrategyKind::GoalDirected => &self.goal_directed,
            StrategyKind::CalorieFloor => &self.calorie_floor,
        }
    }

    /// Propose one substitution for the worst item.
    ///
    /// `Ok(None)` means no suggestion is available: no items, no candidate
    /// that beats the original, or the search ran past its deadline.
    pub fn suggest_swap(
        &self,
        items: &[FoodItem],
        goal: &Goal,
        rng: &mut dyn RngCore,
    ) -> Result<Option<SwapSuggestion>> {
        let Some(worst) = select_worst_item(items, goal.nutrient) else {
            return Ok(None);
        };
        let original = &items[worst];
        let deadline = Instant::now() + self.config.search_timeout;

        let Some(pool) = self.candidate_pool(goal.nutrient, goal.direction, deadline)? else {
            return Ok(None);
        };
        let replacement = self.pick_replacement(original, &pool, goal.nutrient, goal.direction, deadline, rng);

        match replacement {
            Some(replacement) => {
                let suggestion = SwapSuggestion::new(original.clone(), replacement, *goal, goal.nutrient);
                info!(
                    original = suggestion.original.name(),
                    replacement = suggestion.replacement.name(),
                    goal = %goal,
                    change = suggestion.nutrient_change(),
                    "swap suggested"
                );
                Ok(Some(suggestion))
            }
            None => {
                debug!(original = original.name(), goal = %goal, "no better candidate");
                Ok(None)
            }
        }
    }

    /// Like `suggest_swap`, but a missing suggestion is `NoSuggestion`
    pub fn require_swap(&self, items: &[FoodItem], goal: &Goal, rng: &mut dyn RngCore) -> Result<SwapSuggestion> {
        self.suggest_swap(items, goal, rng)?
            .ok_or(MealError::NoSuggestion)
    }

    /// Swap across the whole meal with the strategy the goal selects.
    ///
    /// Each targeted food item is evaluated on its own; repeated entries of
    /// the same item share one suggestion.
    pub fn suggest_meal_swaps(&self, meal: &Meal, goal: &Goal, rng: &mut dyn RngCore) -> Result<SwapResult> {
        let strategy = self.strategy(StrategyKind::for_goal(goal));
        let items = meal.food_items();
        let (nutrient, direction) = strategy.ranking(goal);
        let deadline = Instant::now() + self.config.search_timeout;

        let mut swaps: Vec<SwapSuggestion> = Vec::new();
        let targets = strategy.targets(&items, goal);
        if !targets.is_empty() {
            if let Some(pool) = self.candidate_pool(nutrient, direction, deadline)? {
                for index in targets {
                    let original = &items[index];
                    if swaps.iter().any(|s| s.original.id() == original.id()) {
                        continue;
                    }
                    if Instant::now() >= deadline {
                        warn!(swaps = swaps.len(), "swap search deadline reached; returning partial result");
                        break;
                    }
                    if let Some(replacement) =
                        self.pick_replacement(original, &pool, nutrient, direction, deadline, rng)
                    {
                        swaps.push(SwapSuggestion::new(original.clone(), replacement, *goal, nutrient));
                    }
                }
            }
        }

        let result = SwapResult::evaluate(meal, *goal, strategy.kind(), swaps)?;
        info!(
            strategy = ?result.strategy,
            swaps = result.swap_count(),
            goal = %goal,
            goal_met = result.goal_met,
            "meal swaps evaluated"
        );
        Ok(result)
    }

    /// Bounded catalog query ordered by `nutrient`; `None` once past the deadline
    fn candidate_pool(
        &self,
        nutrient: NutrientKind,
        direction: GoalDirection,
        deadline: Instant,
    ) -> Result<Option<Vec<FoodItem>>> {
        let started = Instant::now();
        let Some(pool) = self
            .catalog
            .top_by_nutrient_until(nutrient, direction, self.config.sample_size, deadline)?
        else {
            warn!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "catalog search exceeded its deadline; no suggestion"
            );
            return Ok(None);
        };
        debug!(candidates = pool.len(), %nutrient, "candidate pool loaded");
        Ok(Some(pool))
    }

    /// Filter by direction, rank, and draw one of the top K at random
    fn pick_replacement(
        &self,
        original: &FoodItem,
        pool: &[FoodItem],
        nutrient: NutrientKind,
        direction: GoalDirection,
        deadline: Instant,
        rng: &mut dyn RngCore,
    ) -> Option<FoodItem> {
        let current = original.value_of(nutrient);
        let mut survivors: Vec<FoodItem> = Vec::new();
        for (index, candidate) in pool.iter().enumerate() {
            if index % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                warn!(original = original.name(), "candidate scan exceeded its deadline");
                return None;
            }
            if candidate.id() == original.id() || candidate.description() == original.description() {
                continue;
            }
            if direction.improves(current, candidate.value_of(nutrient)) {
                survivors.push(candidate.clone());
            }
        }

        sort_by_nutrient(&mut survivors, nutrient, direction);
        survivors.truncate(self.config.top_k.max(1));
        survivors.choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::food;
    use crate::models::{GoalPercent, MealShellRegistry, MealTypeKind, NewFoodItem, NutrientProfile};
    use crate::repository::InMemoryFoodCatalog;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn protein_up() -> Goal {
        Goal::new(NutrientKind::Protein, GoalDirection::Increase, GoalPercent::Ten)
    }

    fn catalog() -> InMemoryFoodCatalog {
        InMemoryFoodCatalog::with_items(vec![
            food(10, "Steak", 26.0, 0.0, 15.0),
            food(11, "Chicken", 31.0, 0.0, 3.6),
            food(12, "Lentils", 9.0, 20.0, 0.4),
            food(13, "Rice", 2.7, 28.0, 0.3),
            food(14, "Cucumber", 0.7, 3.6, 0.1),
            food(15, "Tuna", 29.0, 0.0, 1.0),
            food(16, "Tempeh", 19.0, 9.0, 11.0),
            food(17, "Egg", 13.0, 1.1, 11.0),
            food(18, "Cheddar", 25.0, 1.3, 33.0),
        ])
    }

    #[test]
    fn test_increase_protein_suggests_richer_item() {
        let catalog = InMemoryFoodCatalog::with_items(vec![food(10, "Steak", 26.0, 0.0, 15.0)]);
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let items = vec![food(1, "Apple", 0.3, 14.0, 0.2)];
        let mut rng = StdRng::seed_from_u64(7);

        let swap = engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().unwrap();
        assert_eq!(swap.original.name(), "Apple");
        assert_eq!(swap.replacement.name(), "Steak");
        assert!(swap.replacement_value > swap.original_value);
        assert_eq!(swap.replacement_value, 26.0);
    }

    #[test]
    fn test_replaces_worst_item_and_draws_from_top_k() {
        let catalog = catalog();
        let config = SwapConfig {
            top_k: 3,
            ..SwapConfig::default()
        };
        let engine = GoalDirectedSwapEngine::new(&catalog, config);
        let items = vec![food(1, "Bread", 3.0, 15.0, 1.0), food(2, "Apple", 0.3, 14.0, 0.2)];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let swap = engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().unwrap();
            assert_eq!(swap.original.name(), "Apple");
            assert!(
                ["Chicken", "Tuna", "Steak"].contains(&swap.replacement.name()),
                "unexpected pick {}",
                swap.replacement.name()
            );
        }
    }

    #[test]
    fn test_decrease_keeps_only_lower_candidates() {
        let catalog = catalog();
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let goal = Goal::new(NutrientKind::Fat, GoalDirection::Decrease, GoalPercent::Five);
        let items = vec![food(1, "Avocado", 2.0, 9.0, 15.0), food(2, "Butter", 0.9, 0.1, 81.0)];
        let mut rng = StdRng::seed_from_u64(1);

        let swap = engine.suggest_swap(&items, &goal, &mut rng).unwrap().unwrap();
        assert_eq!(swap.original.name(), "Avocado");
        assert!(swap.replacement_value < 15.0);
    }

    #[test]
    fn test_no_candidate_is_none_not_error() {
        let catalog = InMemoryFoodCatalog::with_items(vec![food(10, "Cucumber", 0.7, 3.6, 0.1)]);
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let items = vec![food(1, "Chicken", 31.0, 0.0, 3.6)];
        let mut rng = StdRng::seed_from_u64(3);

        assert!(engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().is_none());
        assert!(matches!(
            engine.require_swap(&items, &protein_up(), &mut rng),
            Err(MealError::NoSuggestion)
        ));
        assert!(engine.suggest_swap(&[], &protein_up(), &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_same_description_is_excluded() {
        let twin = FoodItem::new(
            20,
            NewFoodItem {
                name: "Apple (organic)".to_string(),
                description: "apple".to_string(),
                food_group: "fruit".to_string(),
                serving_size: 100.0,
                unit: "g".to_string(),
                calories: None,
                nutrients: NutrientProfile::with_macros(40.0, 14.0, 0.2),
            },
        )
        .unwrap();
        let catalog = InMemoryFoodCatalog::with_items(vec![twin]);
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let items = vec![food(1, "Apple", 0.3, 14.0, 0.2)];
        let mut rng = StdRng::seed_from_u64(3);
        assert!(engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_expired_deadline_is_no_suggestion() {
        let catalog = catalog();
        let config = SwapConfig {
            search_timeout: Duration::ZERO,
            ..SwapConfig::default()
        };
        let engine = GoalDirectedSwapEngine::new(&catalog, config);
        let items = vec![food(1, "Apple", 0.3, 14.0, 0.2)];
        let mut rng = StdRng::seed_from_u64(3);
        assert!(engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_calorie_floor_replaces_every_light_item() {
        let catalog = catalog();
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let goal = Goal::new(NutrientKind::Calories, GoalDirection::Increase, GoalPercent::Twenty);

        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let mut meal = MealShellRegistry::default().create(MealTypeKind::Lunch, 1, date).unwrap();
        meal.add_food_item(food(1, "Celery", 0.7, 3.0, 0.2), 1.0).unwrap();
        meal.add_food_item(food(2, "Pasta", 13.0, 75.0, 1.5), 1.0).unwrap();
        meal.add_food_item(food(3, "Banana", 1.1, 23.0, 0.3), 2.0).unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let result = engine.suggest_meal_swaps(&meal, &goal, &mut rng).unwrap();

        assert_eq!(result.strategy, StrategyKind::CalorieFloor);
        assert_eq!(result.swap_count(), 2);
        let originals: Vec<&str> = result.swaps.iter().map(|s| s.original.name()).collect();
        assert_eq!(originals, vec!["Celery", "Banana"]);
        assert!(result.swaps.iter().all(|s| s.replacement_value > s.original_value));
        assert!(result.calorie_change > 0.0);
        assert!(result.moves_toward_goal());
    }

    #[test]
    fn test_goal_directed_meal_swaps_each_item() {
        let catalog = catalog();
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());

        let date = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
        let mut meal = MealShellRegistry::default().create(MealTypeKind::Dinner, 1, date).unwrap();
        meal.add_food_item(food(1, "Apple", 0.3, 14.0, 0.2), 1.0).unwrap();
        meal.add_food_item(food(11, "Chicken", 31.0, 0.0, 3.6), 1.0).unwrap();
        meal.add_food_item(food(1, "Apple", 0.3, 14.0, 0.2), 1.0).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let result = engine.suggest_meal_swaps(&meal, &protein_up(), &mut rng).unwrap();

        // Chicken already tops the catalog; the repeated apple is swapped once
        assert_eq!(result.strategy, StrategyKind::GoalDirected);
        assert_eq!(result.swap_count(), 1);
        assert_eq!(result.swaps[0].original.name(), "Apple");
        assert!(result.goal_met);

        let mut applied = meal.clone();
        assert_eq!(result.apply_to(&mut applied).unwrap(), 2);
    }

    #[test]
    fn test_meal_swaps_match_the_listed_substitutions() {
        let catalog = InMemoryFoodCatalog::with_items(vec![
            food(11, "Chicken", 31.0, 0.0, 3.6),
            food(15, "Tuna", 29.0, 0.0, 1.0),
        ]);
        let engine = GoalDirectedSwapEngine::new(&catalog, SwapConfig::default());
        let date = NaiveDate::from_ymd_opt(2025, 7, 3).unwrap();
        let mut meal = MealShellRegistry::default().create(MealTypeKind::Lunch, 1, date).unwrap();
        meal.add_food_item(food(1, "Apple", 0.3, 14.0, 0.2), 1.0).unwrap();
        meal.add_food_item(food(15, "Tuna", 29.0, 0.0, 1.0), 1.0).unwrap();

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = engine.suggest_meal_swaps(&meal, &protein_up(), &mut rng).unwrap();

            // Each entry ends up as its own listed replacement, never a chain of them
            let expected: Vec<FoodItem> = meal
                .food_items()
                .into_iter()
                .map(|item| {
                    result
                        .swaps
                        .iter()
                        .find(|s| s.original.id() == item.id())
                        .map(|s| s.replacement.clone())
                        .unwrap_or(item)
                })
                .collect();
            let expected_protein: f64 = expected.iter().map(|i| i.value_of(NutrientKind::Protein)).sum();
            assert!((result.goal_nutrient_after - expected_protein).abs() < 1e-9);

            let mut applied = meal.clone();
            assert_eq!(result.apply_to(&mut applied).unwrap(), result.swap_count());
            assert_eq!(applied.food_items(), expected);
        }
    }

    /// Catalog whose ranked query takes `delay`
    struct SlowCatalog {
        inner: InMemoryFoodCatalog,
        delay: Duration,
    }

    impl FoodCatalogRepository for SlowCatalog {
        fn load_food_item(&self, id: i64) -> Result<FoodItem> {
            self.inner.load_food_item(id)
        }

        fn list_food_items(&self) -> Result<Vec<(i64, String)>> {
            self.inner.list_food_items()
        }

        fn search_by_name(&self, term: &str) -> Result<Vec<FoodItem>> {
            self.inner.search_by_name(term)
        }

        fn search_by_group(&self, group: &str) -> Result<Vec<FoodItem>> {
            self.inner.search_by_group(group)
        }

        fn add_food_item(&self, data: NewFoodItem) -> Result<FoodItem> {
            self.inner.add_food_item(data)
        }

        fn sample(&self, limit: usize) -> Result<Vec<FoodItem>> {
            self.inner.sample(limit)
        }

        fn top_by_nutrient(
            &self,
            kind: NutrientKind,
            direction: GoalDirection,
            limit: usize,
        ) -> Result<Vec<FoodItem>> {
            std::thread::sleep(self.delay);
            self.inner.top_by_nutrient(kind, direction, limit)
        }
    }

    #[test]
    fn test_slow_catalog_past_timeout_is_no_suggestion() {
        let slow = SlowCatalog {
            inner: catalog(),
            delay: Duration::from_millis(60),
        };
        let items = vec![food(1, "Apple", 0.3, 14.0, 0.2)];
        let mut rng = StdRng::seed_from_u64(3);

        let tight = SwapConfig {
            search_timeout: Duration::from_millis(10),
            ..SwapConfig::default()
        };
        let engine = GoalDirectedSwapEngine::new(&slow, tight);
        assert!(engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().is_none());

        let relaxed = SwapConfig {
            search_timeout: Duration::from_secs(5),
            ..SwapConfig::default()
        };
        let engine = GoalDirectedSwapEngine::new(&slow, relaxed);
        assert!(engine.suggest_swap(&items, &protein_up(), &mut rng).unwrap().is_some());
    }
}

//! Goal-directed food swaps

mod engine;
mod strategy;
mod suggestion;

pub use engine::{
    GoalDirectedSwapEngine, SwapConfig, DEFAULT_CALORIE_FLOOR, DEFAULT_SAMPLE_SIZE, DEFAULT_SEARCH_TIMEOUT,
    DEFAULT_TOP_K,
};
pub use strategy::{select_worst_item, CalorieFloorStrategy, GoalDirectedStrategy, StrategyKind, SwapStrategy};
pub use suggestion::{SwapResult, SwapSuggestion};

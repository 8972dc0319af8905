//! Service Info Tool
//!
//! Build metadata, database location and the active swap settings.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::config::AppConfig;
use crate::db::{migrations, Database};
use crate::error::Result;
use crate::repository::FoodCatalogRepository;
use crate::swap::SwapConfig;

/// Short usage guide returned alongside the service info
pub const USAGE: &str = "\
1. register_user, then set_goal (nutrient, increase/decrease, 5/10/15/20 percent).
2. add_food_item to grow the catalog; search_food_items or list_food_group to find ids.
3. available_meal_types shows which meal types still fit the day.
4. log_meal with food item ids and quantities (preview_meal to check totals first).
5. suggest_swap or suggest_meal_swaps on a saved meal; apply_swap to accept one.";

/// Package metadata baked in by cargo
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub build: BuildInfo,
    pub uptime_seconds: u64,
    pub database_path: PathBuf,
    pub schema_version: i32,
    pub food_items: usize,
    pub swap: SwapConfig,
    pub daily_calorie_target: f64,
    pub usage: &'static str,
}

/// Tracks process start for uptime reporting
#[derive(Debug, Clone)]
pub struct StatusTracker {
    started: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: impl AsRef<Path>) -> Self {
        Self {
            started: Instant::now(),
            database_path: database_path.as_ref().to_path_buf(),
        }
    }

    pub fn service_info(
        &self,
        database: &Database,
        catalog: &dyn FoodCatalogRepository,
        config: &AppConfig,
    ) -> Result<ServiceInfo> {
        let schema_version = database.with_conn(|conn| migrations::get_schema_version(conn))?;
        Ok(ServiceInfo {
            build: BuildInfo::current(),
            uptime_seconds: self.started.elapsed().as_secs(),
            database_path: self.database_path.clone(),
            schema_version,
            food_items: catalog.list_food_items()?.len(),
            swap: config.swap,
            daily_calorie_target: config.daily_calorie_target,
            usage: USAGE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::food_catalog::test_support::{migrated_db, new_food};
    use crate::db::SqliteFoodCatalog;

    #[test]
    fn test_service_info_reports_catalog_and_schema() {
        let db = migrated_db();
        let catalog = SqliteFoodCatalog::new(db.clone());
        catalog.add_food_item(new_food("Rice", "grain", 2.7, 28.0, 0.3)).unwrap();

        let tracker = StatusTracker::new(":memory:");
        let info = tracker.service_info(&db, &catalog, &AppConfig::default()).unwrap();
        assert_eq!(info.schema_version, 1);
        assert_eq!(info.food_items, 1);
        assert_eq!(info.swap.top_k, 5);
        assert_eq!(info.build.name, "mealswap");
        assert_eq!(info.build.version, env!("CARGO_PKG_VERSION"));
    }
}

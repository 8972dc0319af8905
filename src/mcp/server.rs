//! Meal Swap MCP Server Implementation
//!
//! Exposes the meal, catalog, user and swap tools over MCP.

use std::collections::BTreeMap;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::AppConfig;
use crate::db::{Database, SqliteFoodCatalog, SqliteMealRepository, SqliteUserRepository};
use crate::error::MealError;
use crate::models::{Goal, MealTypeKind, NewFoodItem, NewUser, NutrientCategory, NutrientProfile};
use crate::tools::status::StatusTracker;
use crate::tools::{food_items, meals, parse_date, swaps, users};
use crate::tools::meals::{LogMealRequest, MealItemInput};

/// Meal Swap MCP Service
#[derive(Clone)]
pub struct MealSwapService {
    database: Database,
    catalog: SqliteFoodCatalog,
    meals: SqliteMealRepository,
    users: SqliteUserRepository,
    config: AppConfig,
    status: StatusTracker,
    tool_router: ToolRouter<MealSwapService>,
}

impl MealSwapService {
    pub fn new(config: AppConfig, database: Database) -> Self {
        Self {
            catalog: SqliteFoodCatalog::new(database.clone()),
            meals: SqliteMealRepository::new(database.clone()),
            users: SqliteUserRepository::new(database.clone(), config.bcrypt_cost),
            status: StatusTracker::new(&config.database_path),
            database,
            config,
            tool_router: Self::tool_router(),
        }
    }
}

/// Client mistakes become invalid-params errors; storage failures are internal
fn to_mcp_error(err: MealError) -> McpError {
    match err {
        MealError::Repository(_) => {
            error!(error = %err, "repository failure");
            McpError::internal_error(err.to_string(), None)
        }
        other => McpError::invalid_params(other.to_string(), None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn date_arg(value: &str) -> Result<chrono::NaiveDate, McpError> {
    parse_date(value).map_err(to_mcp_error)
}

// ============================================================================
// Food Item Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFoodItemParams {
    pub name: String,
    /// Free-text description; defaults to the lowercased name
    pub description: Option<String>,
    pub food_group: String,
    pub serving_size: f64,
    /// Serving unit, e.g. "g", "ml" or "count"
    pub unit: String,
    /// Label calories, informational only; totals use protein*4 + carbs*4 + fat*9
    pub calories: Option<f64>,
    pub protein: f64,
    pub carbohydrate: f64,
    pub fat: f64,
    #[serde(default)]
    pub fibre: Option<f64>,
    #[serde(default)]
    pub sugar: Option<f64>,
    /// Sodium in mg
    #[serde(default)]
    pub sodium: Option<f64>,
    #[serde(default)]
    pub vitamins: BTreeMap<String, f64>,
    #[serde(default)]
    pub minerals: BTreeMap<String, f64>,
}

impl AddFoodItemParams {
    fn into_new_food_item(self) -> NewFoodItem {
        let mut nutrients = NutrientProfile::with_macros(self.protein, self.carbohydrate, self.fat);
        for (name, amount) in [("fibre", self.fibre), ("sugar", self.sugar)] {
            if let Some(amount) = amount {
                nutrients = nutrients.with(NutrientCategory::Macro, name, amount);
            }
        }
        if let Some(sodium) = self.sodium {
            nutrients = nutrients.with(NutrientCategory::Mineral, "sodium", sodium);
        }
        for (name, amount) in &self.vitamins {
            nutrients = nutrients.with(NutrientCategory::Vitamin, name, *amount);
        }
        for (name, amount) in &self.minerals {
            nutrients = nutrients.with(NutrientCategory::Mineral, name, *amount);
        }
        NewFoodItem {
            description: self.description.unwrap_or_else(|| self.name.to_lowercase()),
            name: self.name,
            food_group: self.food_group,
            serving_size: self.serving_size,
            unit: self.unit,
            calories: self.calories,
            nutrients,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFoodItemParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodItemsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFoodGroupParams {
    pub food_group: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListFoodItemsParams {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_list_limit() -> usize { 50 }

// ============================================================================
// User Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RegisterUserParams {
    pub email: String,
    pub display_name: String,
    /// At least 8 characters; stored only as a bcrypt hash
    pub password: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AuthenticateUserParams {
    pub email: String,
    pub password: String,
}

/// Goal arguments; give all three or none
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct GoalParams {
    /// calories, protein, carbohydrate, fat, fibre, sugar or sodium
    pub nutrient: Option<String>,
    /// increase or decrease
    pub direction: Option<String>,
    /// 5, 10, 15 or 20
    pub percent: Option<u8>,
}

impl GoalParams {
    fn into_goal(self) -> Result<Option<Goal>, McpError> {
        match (self.nutrient, self.direction, self.percent) {
            (Some(nutrient), Some(direction), Some(percent)) => {
                Goal::parse(&nutrient, &direction, percent).map(Some).map_err(to_mcp_error)
            }
            (None, None, None) => Ok(None),
            _ => Err(McpError::invalid_params(
                "Goal needs nutrient, direction and percent together",
                None,
            )),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetGoalParams {
    pub user_id: i64,
    /// Omit all goal fields to clear the goal
    #[serde(flatten)]
    pub goal: GoalParams,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AvailableMealTypesParams {
    pub user_id: i64,
    /// ISO date, YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealItemParams {
    pub food_item_id: i64,
    /// Servings eaten (default 1)
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

fn default_quantity() -> f64 { 1.0 }

impl From<MealItemParams> for MealItemInput {
    fn from(p: MealItemParams) -> Self {
        Self {
            food_item_id: p.food_item_id,
            quantity: p.quantity,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogMealParams {
    pub user_id: i64,
    /// ISO date, YYYY-MM-DD
    pub date: String,
    /// breakfast, lunch, dinner or snack
    pub meal_type: String,
    #[serde(default)]
    pub items: Vec<MealItemParams>,
    /// Saved meal whose items are staged first, one serving each
    pub import_from_meal_id: Option<i64>,
    pub notes: Option<String>,
}

impl LogMealParams {
    fn into_request(self) -> Result<LogMealRequest, McpError> {
        Ok(LogMealRequest {
            user_id: self.user_id,
            date: date_arg(&self.date)?,
            meal_type: MealTypeKind::parse(&self.meal_type).map_err(to_mcp_error)?,
            items: self.items.into_iter().map(MealItemInput::from).collect(),
            import_from: self.import_from_meal_id,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealIdParams {
    pub meal_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CopyMealParams {
    pub meal_id: i64,
    /// Target ISO date, YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMealsParams {
    pub user_id: i64,
    pub start_date: String,
    /// Defaults to start_date
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealItemChangeParams {
    pub meal_id: i64,
    pub food_item_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveMealItemParams {
    pub meal_id: i64,
    pub food_item_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DailySummaryParams {
    pub user_id: i64,
    pub date: String,
    /// Overrides the configured daily calorie target
    pub daily_calories: Option<f64>,
}

// ============================================================================
// Swap Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SuggestSwapParams {
    pub meal_id: i64,
    /// Overrides the meal owner's saved goal
    #[serde(flatten)]
    pub goal: GoalParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ApplySwapParams {
    pub meal_id: i64,
    pub original_food_item_id: i64,
    pub replacement_food_item_id: i64,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl MealSwapService {
    // --- Status ---

    #[tool(description = "Get build info, database location, catalog size, swap settings and a short usage guide")]
    fn service_info(&self) -> Result<CallToolResult, McpError> {
        let info = self
            .status
            .service_info(&self.database, &self.catalog, &self.config)
            .map_err(to_mcp_error)?;
        json_result(&info)
    }

    // --- Food Items ---

    #[tool(description = "Add a food item to the catalog. Nutrients are per serving; calories are derived from protein, carbohydrate and fat.")]
    fn add_food_item(&self, Parameters(p): Parameters<AddFoodItemParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::add_food_item(&self.catalog, p.into_new_food_item()).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Get full details for a food item including every stored nutrient")]
    fn get_food_item(&self, Parameters(p): Parameters<GetFoodItemParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::get_food_item(&self.catalog, p.id).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Search food items by name")]
    fn search_food_items(&self, Parameters(p): Parameters<SearchFoodItemsParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::search_food_items(&self.catalog, &p.query, p.limit).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "List every food item in a food group")]
    fn list_food_group(&self, Parameters(p): Parameters<ListFoodGroupParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::list_food_group(&self.catalog, &p.food_group).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "List catalog ids and descriptions with pagination")]
    fn list_food_items(&self, Parameters(p): Parameters<ListFoodItemsParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::list_food_items(&self.catalog, p.limit, p.offset).map_err(to_mcp_error)?;
        json_result(&result)
    }

    // --- Users ---

    #[tool(description = "Register a user account")]
    fn register_user(&self, Parameters(p): Parameters<RegisterUserParams>) -> Result<CallToolResult, McpError> {
        let data = NewUser {
            email: p.email,
            display_name: p.display_name,
            password: p.password,
        };
        let result = users::register_user(&self.users, data).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Check an email and password; returns the user when they match")]
    fn authenticate_user(&self, Parameters(p): Parameters<AuthenticateUserParams>) -> Result<CallToolResult, McpError> {
        let result = users::authenticate_user(&self.users, &p.email, &p.password).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Set or clear a user's nutrition goal: a nutrient, increase/decrease, and 5, 10, 15 or 20 percent")]
    fn set_goal(&self, Parameters(p): Parameters<SetGoalParams>) -> Result<CallToolResult, McpError> {
        let goal = p.goal.into_goal()?;
        let result = users::set_goal(&self.users, p.user_id, goal).map_err(to_mcp_error)?;
        json_result(&result)
    }

    // --- Meals ---

    #[tool(description = "List the meal types a user can still log on a date. Breakfast, lunch and dinner are once per day; snacks are unlimited.")]
    fn available_meal_types(&self, Parameters(p): Parameters<AvailableMealTypesParams>) -> Result<CallToolResult, McpError> {
        let date = date_arg(&p.date)?;
        let result = meals::available_meal_types(&self.meals, p.user_id, date, self.config.daily_calorie_target)
            .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Log a meal of food items with quantities. Optionally import the items of a saved meal first.")]
    fn log_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        let request = p.into_request()?;
        let result = meals::log_meal(&self.catalog, &self.meals, request).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Build a meal and show its totals without saving it")]
    fn preview_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        let request = p.into_request()?;
        let result = meals::preview_meal(&self.catalog, &self.meals, request).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Copy a saved meal onto another date")]
    fn copy_meal(&self, Parameters(p): Parameters<CopyMealParams>) -> Result<CallToolResult, McpError> {
        let date = date_arg(&p.date)?;
        let result = meals::copy_meal(&self.meals, p.meal_id, date).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Get a meal with per-item nutrients and meal totals")]
    fn get_meal(&self, Parameters(p): Parameters<MealIdParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_meal(&self.meals, p.meal_id).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "List a user's meals between two dates (inclusive)")]
    fn list_meals(&self, Parameters(p): Parameters<ListMealsParams>) -> Result<CallToolResult, McpError> {
        let start = date_arg(&p.start_date)?;
        let end = match p.end_date.as_deref() {
            Some(end) => date_arg(end)?,
            None => start,
        };
        let result = meals::list_meals(&self.meals, p.user_id, start, end).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Add a food item to a saved meal")]
    fn add_meal_item(&self, Parameters(p): Parameters<MealItemChangeParams>) -> Result<CallToolResult, McpError> {
        let item = MealItemInput {
            food_item_id: p.food_item_id,
            quantity: p.quantity,
        };
        let result = meals::add_meal_item(&self.catalog, &self.meals, p.meal_id, item).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Change the quantity of a food item in a saved meal")]
    fn update_meal_item(&self, Parameters(p): Parameters<MealItemChangeParams>) -> Result<CallToolResult, McpError> {
        let item = MealItemInput {
            food_item_id: p.food_item_id,
            quantity: p.quantity,
        };
        let result = meals::update_meal_item(&self.meals, p.meal_id, item).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Remove a food item from a saved meal. The last item cannot be removed; delete the meal instead.")]
    fn remove_meal_item(&self, Parameters(p): Parameters<RemoveMealItemParams>) -> Result<CallToolResult, McpError> {
        let result = meals::remove_meal_item(&self.meals, p.meal_id, p.food_item_id).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Delete a meal, freeing its meal-type slot for the day")]
    fn delete_meal(&self, Parameters(p): Parameters<MealIdParams>) -> Result<CallToolResult, McpError> {
        let result = meals::delete_meal(&self.meals, p.meal_id).map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Nutrient totals for a day, broken down by meal type against recommended calorie shares")]
    fn daily_summary(&self, Parameters(p): Parameters<DailySummaryParams>) -> Result<CallToolResult, McpError> {
        let date = date_arg(&p.date)?;
        let target = p.daily_calories.unwrap_or(self.config.daily_calorie_target);
        let result = meals::daily_summary(&self.meals, p.user_id, date, target).map_err(to_mcp_error)?;
        json_result(&result)
    }

    // --- Swaps ---

    #[tool(description = "Suggest one food swap that moves a saved meal toward the user's goal (or the goal given)")]
    fn suggest_swap(&self, Parameters(p): Parameters<SuggestSwapParams>) -> Result<CallToolResult, McpError> {
        let goal = p.goal.into_goal()?;
        let mut rng = rand::thread_rng();
        let result = swaps::suggest_swap(
            &self.catalog,
            &self.meals,
            &self.users,
            self.config.swap,
            p.meal_id,
            goal,
            &mut rng,
        )
        .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Suggest swaps across a whole saved meal and report whether they meet the goal. Nothing is saved.")]
    fn suggest_meal_swaps(&self, Parameters(p): Parameters<SuggestSwapParams>) -> Result<CallToolResult, McpError> {
        let goal = p.goal.into_goal()?;
        let mut rng = rand::thread_rng();
        let result = swaps::suggest_meal_swaps(
            &self.catalog,
            &self.meals,
            &self.users,
            self.config.swap,
            p.meal_id,
            goal,
            &mut rng,
        )
        .map_err(to_mcp_error)?;
        json_result(&result)
    }

    #[tool(description = "Apply a swap to a saved meal, replacing every entry of the original food item and keeping quantities")]
    fn apply_swap(&self, Parameters(p): Parameters<ApplySwapParams>) -> Result<CallToolResult, McpError> {
        let result = swaps::apply_swap(
            &self.catalog,
            &self.meals,
            p.meal_id,
            p.original_food_item_id,
            p.replacement_food_item_id,
        )
        .map_err(to_mcp_error)?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MealSwapService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mealswap".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Meal Swap".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Meal Swap - meal logging with daily meal-type rules and goal-directed food swaps. \
                 Call service_info for a usage guide. \
                 Catalog: add_food_item, get_food_item, search_food_items, list_food_group, list_food_items. \
                 Users: register_user, authenticate_user, set_goal. \
                 Meals: available_meal_types, log_meal, preview_meal, copy_meal, get_meal, list_meals, \
                 add/update/remove_meal_item, delete_meal, daily_summary. \
                 Swaps: suggest_swap, suggest_meal_swaps, apply_swap."
                    .into(),
            ),
        }
    }
}

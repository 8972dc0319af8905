//! Meal Swap
//!
//! An MCP server for meal logging and goal-directed food swaps.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mealswap::config::AppConfig;
use mealswap::db;
use mealswap::mcp::MealSwapService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mealswap=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting mealswap MCP server on stdio");

    let config = AppConfig::from_env();
    eprintln!("Database path: {}", config.database_path.display());

    // Ensure data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    eprintln!("Initializing database...");
    let database = db::Database::new(&config.database_path)?;

    // Run migrations
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    info!(
        sample_size = config.swap.sample_size,
        top_k = config.swap.top_k,
        calorie_floor = config.swap.calorie_floor,
        timeout_ms = config.swap.search_timeout.as_millis() as u64,
        "swap engine configured"
    );

    let service = MealSwapService::new(config, database);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}

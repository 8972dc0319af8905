//! Utility to set or clear a user's nutrition goal in the database
//!
//! Usage: set_user_goal <user_id> <nutrient> <increase|decrease> <5|10|15|20>
//!        set_user_goal <user_id> clear

use mealswap::config::AppConfig;
use mealswap::db::{migrations, Database, SqliteUserRepository};
use mealswap::models::Goal;
use mealswap::tools::users;

const USAGE: &str = "usage: set_user_goal <user_id> <nutrient> <increase|decrease> <5|10|15|20>\n       set_user_goal <user_id> clear";

fn parse_args(args: &[String]) -> Result<(i64, Option<Goal>), Box<dyn std::error::Error>> {
    match args {
        [user_id, clear] if clear == "clear" => Ok((user_id.parse()?, None)),
        [user_id, nutrient, direction, percent] => {
            let goal = Goal::parse(nutrient, direction, percent.parse()?)?;
            Ok((user_id.parse()?, Some(goal)))
        }
        _ => Err(USAGE.into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (user_id, goal) = parse_args(&args)?;

    let config = AppConfig::from_env();
    println!("Database path: {}", config.database_path.display());
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&config.database_path)?;
    database.with_conn(|conn| migrations::run_migrations(conn))?;

    let repo = SqliteUserRepository::new(database, config.bcrypt_cost);
    let response = users::set_goal(&repo, user_id, goal)?;

    println!("User {} ({}):", response.user.id, response.user.email);
    match &response.previous_goal {
        Some(previous) => println!("  Previous goal: {}", previous),
        None => println!("  Previous goal: none"),
    }
    println!(
        "  Goal: {}",
        response.goal_description.as_deref().unwrap_or("none")
    );
    Ok(())
}

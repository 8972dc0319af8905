//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- USERS
        -- Account, profile and the current nutrition goal
        -- ============================================
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,

            -- Goal is replaced wholesale; all three set or all three null
            goal_nutrient TEXT,
            goal_direction TEXT CHECK(goal_direction IN ('increase', 'decrease')),
            goal_percent INTEGER CHECK(goal_percent IN (5, 10, 15, 20)),

            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- ============================================
        -- FOOD ITEMS
        -- Catalog entries; nutrients live in food_item_nutrients
        -- ============================================
        CREATE TABLE food_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            food_group TEXT NOT NULL,
            serving_size REAL NOT NULL,
            unit TEXT NOT NULL,
            calories REAL,                       -- label value, never used for totals
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_food_items_name ON food_items(name);
        CREATE INDEX idx_food_items_group ON food_items(food_group);

        CREATE TABLE food_item_nutrients (
            food_item_id INTEGER NOT NULL REFERENCES food_items(id) ON DELETE CASCADE,
            category TEXT NOT NULL CHECK(category IN ('macro', 'vitamin', 'mineral')),
            name TEXT NOT NULL,                  -- lowercase lookup key
            amount REAL NOT NULL CHECK(amount >= 0),

            PRIMARY KEY (food_item_id, category, name)
        );

        CREATE INDEX idx_food_item_nutrients_name ON food_item_nutrients(name, amount);

        -- ============================================
        -- MEALS
        -- One row per logged meal; soft-deleted via deleted_at
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,                  -- ISO date: "2025-01-09"
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX idx_meals_user_date ON meals(user_id, date);

        -- ============================================
        -- MEAL FOOD ITEMS
        -- Ordered (food item, quantity) entries of a meal
        -- ============================================
        CREATE TABLE meal_food_items (
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            food_item_id INTEGER NOT NULL REFERENCES food_items(id) ON DELETE RESTRICT,
            quantity REAL NOT NULL CHECK(quantity > 0),

            PRIMARY KEY (meal_id, position)
        );

        CREATE INDEX idx_meal_food_items_food ON meal_food_items(food_item_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }
}

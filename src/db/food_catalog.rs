//! SQLite food catalog
//!
//! Items live in `food_items`; their nutrients are rows of
//! `food_item_nutrients` keyed by category and lowercase name.

use std::time::Instant;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{MealError, Result};
use crate::models::{FoodItem, GoalDirection, NewFoodItem, NutrientCategory, NutrientKind, NutrientProfile};
use crate::repository::FoodCatalogRepository;
use super::connection::{with_deadline, Database, DbResult};

const ITEM_COLUMNS: &str = "id, name, description, food_group, serving_size, unit, calories";

/// A `food_items` row plus its nutrients, not yet validated
#[derive(Debug)]
pub(crate) struct FoodItemRow {
    id: i64,
    data: NewFoodItem,
}

impl FoodItemRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            data: NewFoodItem {
                name: row.get(1)?,
                description: row.get(2)?,
                food_group: row.get(3)?,
                serving_size: row.get(4)?,
                unit: row.get(5)?,
                calories: row.get(6)?,
                nutrients: NutrientProfile::new(),
            },
        })
    }

    pub(crate) fn into_food_item(self) -> Result<FoodItem> {
        FoodItem::new(self.id, self.data)
    }
}

fn load_nutrients(conn: &Connection, food_item_id: i64) -> DbResult<NutrientProfile> {
    let mut stmt = conn.prepare_cached(
        "SELECT category, name, amount FROM food_item_nutrients WHERE food_item_id = ?1",
    )?;
    let rows = stmt
        .query_map([food_item_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut profile = NutrientProfile::new();
    for (category, name, amount) in rows {
        // Unknown categories cannot pass the table CHECK; skip rather than fail
        if let Some(category) = NutrientCategory::from_str(&category) {
            profile = profile.with(category, &name, amount);
        }
    }
    Ok(profile)
}

/// Read one item with its nutrients on an existing connection
pub(crate) fn fetch_item(conn: &Connection, id: i64) -> DbResult<Option<FoodItemRow>> {
    let sql = format!("SELECT {} FROM food_items WHERE id = ?1", ITEM_COLUMNS);
    let row = conn
        .query_row(&sql, [id], FoodItemRow::from_row)
        .optional()?;
    match row {
        Some(mut row) => {
            row.data.nutrients = load_nutrients(conn, row.id)?;
            Ok(Some(row))
        }
        None => Ok(None),
    }
}

fn fetch_where(conn: &Connection, clause: &str, param: &str) -> DbResult<Vec<FoodItemRow>> {
    let sql = format!("SELECT {} FROM food_items WHERE {} ORDER BY name, id", ITEM_COLUMNS, clause);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query_map([param], FoodItemRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for row in &mut rows {
        row.data.nutrients = load_nutrients(conn, row.id)?;
    }
    Ok(rows)
}

fn into_items(rows: Vec<FoodItemRow>) -> Result<Vec<FoodItem>> {
    rows.into_iter().map(FoodItemRow::into_food_item).collect()
}

/// Canonical key then aliases; names are fixed identifiers
fn lookup_names(kind: NutrientKind) -> Vec<&'static str> {
    std::iter::once(kind.key())
        .chain(kind.aliases().iter().copied())
        .collect()
}

/// Amount of `kind` for the item `f.id`, picked in the same order as
/// `FoodItem::value_of`: first name that matches, macros before vitamins
/// before minerals.
fn amount_expression(kind: NutrientKind) -> String {
    let names = lookup_names(kind);
    let name_rank = names
        .iter()
        .enumerate()
        .map(|(rank, name)| format!("WHEN '{}' THEN {}", name, rank))
        .collect::<Vec<_>>()
        .join(" ");
    let category_rank = NutrientCategory::LOOKUP_ORDER
        .iter()
        .enumerate()
        .map(|(rank, category)| format!("WHEN '{}' THEN {}", category.as_str(), rank))
        .collect::<Vec<_>>()
        .join(" ");
    let in_list = names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "COALESCE((SELECT n.amount FROM food_item_nutrients n
                   WHERE n.food_item_id = f.id AND n.name IN ({})
                   ORDER BY CASE n.name {} END, CASE n.category {} END
                   LIMIT 1), 0)",
        in_list, name_rank, category_rank
    )
}

/// SQL expression ranking a food item by `kind`
fn score_expression(kind: NutrientKind) -> String {
    match kind {
        NutrientKind::Calories => format!(
            "4 * {} + 4 * {} + 9 * {}",
            amount_expression(NutrientKind::Protein),
            amount_expression(NutrientKind::Carbohydrate),
            amount_expression(NutrientKind::Fat)
        ),
        other => amount_expression(other),
    }
}

/// Food catalog backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteFoodCatalog {
    db: Database,
}

impl SqliteFoodCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of items in the catalog
    pub fn count(&self) -> Result<i64> {
        Ok(self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM food_items", [], |row| row.get(0))?)
        })?)
    }
}

impl FoodCatalogRepository for SqliteFoodCatalog {
    fn load_food_item(&self, id: i64) -> Result<FoodItem> {
        self.db
            .with_conn(|conn| fetch_item(conn, id))?
            .ok_or_else(|| MealError::not_found("Food item", id))?
            .into_food_item()
    }

    fn list_food_items(&self) -> Result<Vec<(i64, String)>> {
        Ok(self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, description FROM food_items ORDER BY id")?;
            let items = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })?)
    }

    fn search_by_name(&self, term: &str) -> Result<Vec<FoodItem>> {
        let pattern = format!("%{}%", term.trim());
        let rows = self
            .db
            .with_conn(|conn| fetch_where(conn, "name LIKE ?1 COLLATE NOCASE", &pattern))?;
        into_items(rows)
    }

    fn search_by_group(&self, group: &str) -> Result<Vec<FoodItem>> {
        let group = group.trim().to_lowercase();
        let rows = self
            .db
            .with_conn(|conn| fetch_where(conn, "food_group = ?1", &group))?;
        into_items(rows)
    }

    fn add_food_item(&self, data: NewFoodItem) -> Result<FoodItem> {
        // Validate before touching the database; the id is assigned below
        let validated = FoodItem::new(0, data)?;

        let id = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO food_items (name, description, food_group, serving_size, unit, calories)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    validated.name(),
                    validated.description(),
                    validated.food_group(),
                    validated.serving_size(),
                    validated.unit(),
                    validated.stored_calories(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO food_item_nutrients (food_item_id, category, name, amount)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (category, name, amount) in validated.nutrients().iter() {
                    stmt.execute(params![id, category.as_str(), name, amount])?;
                }
            }
            tx.commit()?;
            Ok(id)
        })?;

        debug!(id, name = validated.name(), "food item added");
        self.load_food_item(id)
    }

    fn sample(&self, limit: usize) -> Result<Vec<FoodItem>> {
        let rows = self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM food_items ORDER BY id LIMIT ?1", ITEM_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map([limit as i64], FoodItemRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for row in &mut rows {
                row.data.nutrients = load_nutrients(conn, row.id)?;
            }
            Ok(rows)
        })?;
        into_items(rows)
    }

    /// Ranked in SQL so the bounded pool holds the best candidates of the
    /// whole catalog, not of an arbitrary slice of it.
    fn top_by_nutrient(
        &self,
        kind: NutrientKind,
        direction: GoalDirection,
        limit: usize,
    ) -> Result<Vec<FoodItem>> {
        let rows = self
            .db
            .with_conn(|conn| ranked_rows(conn, kind, direction, limit))?;
        into_items(rows)
    }

    /// The ranked query runs under a progress handler that interrupts it
    /// once `deadline` passes.
    fn top_by_nutrient_until(
        &self,
        kind: NutrientKind,
        direction: GoalDirection,
        limit: usize,
        deadline: Instant,
    ) -> Result<Option<Vec<FoodItem>>> {
        if Instant::now() >= deadline {
            return Ok(None);
        }
        let rows = self.db.with_conn(|conn| {
            with_deadline(conn, deadline, |conn| ranked_rows(conn, kind, direction, limit))
        })?;
        match rows {
            Some(rows) => Ok(Some(into_items(rows)?)),
            None => {
                warn!(nutrient = %kind, limit, "catalog query interrupted at its deadline");
                Ok(None)
            }
        }
    }
}

/// Up to `limit` items ordered by `kind` in the goal's direction, ties by id
fn ranked_rows(
    conn: &Connection,
    kind: NutrientKind,
    direction: GoalDirection,
    limit: usize,
) -> DbResult<Vec<FoodItemRow>> {
    let order = match direction {
        GoalDirection::Increase => "DESC",
        GoalDirection::Decrease => "ASC",
    };
    let sql = format!(
        "SELECT f.id FROM food_items f ORDER BY {} {}, f.id LIMIT ?1",
        score_expression(kind),
        order
    );

    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([limit as i64], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(row) = fetch_item(conn, id)? {
            rows.push(row);
        }
    }
    Ok(rows)
}

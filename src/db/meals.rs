//! SQLite meal store
//!
//! A meal is a `meals` row plus ordered `meal_food_items` rows. Deleting a
//! meal stamps `deleted_at`; every read skips deleted meals.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, info};

use crate::error::{MealError, Result};
use crate::models::{Meal, MealEntry, MealParts, MealTypeKind};
use crate::repository::{DateRange, MealRepository};
use super::connection::{Database, DbResult};
use super::food_catalog::{fetch_item, FoodItemRow};

/// A live `meals` row before its entries are attached
struct MealRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    meal_type: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MealRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            meal_type: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

const MEAL_COLUMNS: &str = "id, user_id, date, meal_type, notes, created_at, updated_at";

/// Raw meal row plus `(food item, quantity)` rows, in position order
type LoadedMeal = (MealRow, Vec<(FoodItemRow, f64)>);

fn load_entries(conn: &Connection, meal_id: i64) -> DbResult<Vec<(FoodItemRow, f64)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT food_item_id, quantity FROM meal_food_items WHERE meal_id = ?1 ORDER BY position",
    )?;
    let links = stmt
        .query_map([meal_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(links.len());
    for (food_item_id, quantity) in links {
        // ON DELETE RESTRICT keeps referenced items in place
        if let Some(item) = fetch_item(conn, food_item_id)? {
            entries.push((item, quantity));
        }
    }
    Ok(entries)
}

fn load_meal(conn: &Connection, meal_id: i64) -> DbResult<Option<LoadedMeal>> {
    let sql = format!(
        "SELECT {} FROM meals WHERE id = ?1 AND deleted_at IS NULL",
        MEAL_COLUMNS
    );
    let row = conn.query_row(&sql, [meal_id], MealRow::from_row).optional()?;
    match row {
        Some(row) => {
            let entries = load_entries(conn, row.id)?;
            Ok(Some((row, entries)))
        }
        None => Ok(None),
    }
}

fn into_meal((row, entries): LoadedMeal) -> Result<Meal> {
    let entries = entries
        .into_iter()
        .map(|(item, quantity)| MealEntry::new(item.into_food_item()?, quantity))
        .collect::<Result<Vec<_>>>()?;
    Meal::from_parts(MealParts {
        id: row.id,
        user_id: row.user_id,
        date: row.date,
        kind: MealTypeKind::parse(&row.meal_type)?,
        entries,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn insert_entries(tx: &Transaction, meal_id: i64, meal: &Meal) -> DbResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO meal_food_items (meal_id, position, food_item_id, quantity)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, entry) in meal.entries().iter().enumerate() {
        stmt.execute(params![meal_id, position as i64, entry.food_item.id(), entry.quantity])?;
    }
    Ok(())
}

/// Meal repository backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteMealRepository {
    db: Database,
}

impl SqliteMealRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl MealRepository for SqliteMealRepository {
    fn save(&self, meal: &Meal, user_id: i64) -> Result<Meal> {
        if let Some(id) = meal.id() {
            return Err(MealError::Validation(format!(
                "Meal {} is already saved; use update",
                id
            )));
        }
        if meal.is_empty() {
            return Err(MealError::EmptyMeal);
        }
        if meal.user_id() != user_id {
            return Err(MealError::Validation(format!(
                "Meal belongs to user {}, not {}",
                meal.user_id(),
                user_id
            )));
        }

        let id = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO meals (user_id, date, meal_type, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    meal.date(),
                    meal.kind().as_str(),
                    meal.notes(),
                    meal.created_at(),
                    meal.updated_at(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            insert_entries(&tx, id, meal)?;
            tx.commit()?;
            Ok(id)
        })?;

        info!(meal_id = id, user_id, kind = %meal.kind(), date = %meal.date(), "meal saved");
        Ok(meal.clone().with_id(id))
    }

    fn update(&self, meal: &Meal) -> Result<()> {
        let id = meal
            .id()
            .ok_or_else(|| MealError::Validation("Cannot update an unsaved meal".to_string()))?;
        if meal.is_empty() {
            return Err(MealError::EmptyMeal);
        }

        let updated = self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE meals SET notes = ?1, updated_at = ?2 WHERE id = ?3 AND deleted_at IS NULL",
                params![meal.notes(), Utc::now(), id],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            // Entries are replaced wholesale to keep positions dense
            tx.execute("DELETE FROM meal_food_items WHERE meal_id = ?1", [id])?;
            insert_entries(&tx, id, meal)?;
            tx.commit()?;
            Ok(true)
        })?;

        if !updated {
            return Err(MealError::not_found("Meal", id));
        }
        debug!(meal_id = id, entries = meal.entries().len(), "meal updated");
        Ok(())
    }

    fn delete(&self, meal_id: i64) -> Result<bool> {
        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE meals SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![Utc::now(), meal_id],
            )?)
        })?;
        if changed > 0 {
            info!(meal_id, "meal deleted");
        }
        Ok(changed > 0)
    }

    fn get(&self, meal_id: i64) -> Result<Meal> {
        let loaded = self
            .db
            .with_conn(|conn| load_meal(conn, meal_id))?
            .ok_or_else(|| MealError::not_found("Meal", meal_id))?;
        into_meal(loaded)
    }

    fn meals_for_user(&self, user_id: i64, range: DateRange) -> Result<Vec<Meal>> {
        let loaded = self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM meals
                 WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3 AND deleted_at IS NULL
                 ORDER BY date, id",
                MEAL_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id, range.start, range.end], MealRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut loaded = Vec::with_capacity(rows.len());
            for row in rows {
                let entries = load_entries(conn, row.id)?;
                loaded.push((row, entries));
            }
            Ok(loaded)
        })?;
        loaded.into_iter().map(into_meal).collect()
    }

    fn count_for_type(&self, user_id: i64, kind: MealTypeKind, date: NaiveDate) -> Result<u32> {
        Ok(self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM meals
                 WHERE user_id = ?1 AND meal_type = ?2 AND date = ?3 AND deleted_at IS NULL",
                params![user_id, kind.as_str(), date],
                |row| row.get(0),
            )?)
        })?)
    }

    fn import_meal_food_ids(&self, meal_id: i64) -> Result<Vec<i64>> {
        let ids = self.db.with_conn(|conn| {
            let live: Option<i64> = conn
                .query_row(
                    "SELECT id FROM meals WHERE id = ?1 AND deleted_at IS NULL",
                    [meal_id],
                    |row| row.get(0),
                )
                .optional()?;
            if live.is_none() {
                return Ok(None);
            }
            let mut stmt = conn.prepare(
                "SELECT food_item_id FROM meal_food_items WHERE meal_id = ?1 ORDER BY position",
            )?;
            let ids = stmt
                .query_map([meal_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(Some(ids))
        })?;
        ids.ok_or_else(|| MealError::not_found("Meal", meal_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::food_catalog::test_support::{migrated_db, new_food};
    use crate::db::{SqliteFoodCatalog, SqliteUserRepository};
    use crate::models::{FoodItem, MealShellRegistry, NewUser};
    use crate::repository::{FoodCatalogRepository, UserRepository};

    struct Fixture {
        meals: SqliteMealRepository,
        user_id: i64,
        apple: FoodItem,
        bread: FoodItem,
    }

    fn fixture() -> Fixture {
        let db = migrated_db();
        let catalog = SqliteFoodCatalog::new(db.clone());
        let users = SqliteUserRepository::new(db.clone(), 4);
        let user = users
            .save(&NewUser {
                email: "ana@example.com".to_string(),
                display_name: "Ana".to_string(),
                password: "correct horse".to_string(),
            })
            .unwrap();
        Fixture {
            meals: SqliteMealRepository::new(db),
            user_id: user.id,
            apple: catalog.add_food_item(new_food("Apple", "fruit", 0.3, 14.0, 0.2)).unwrap(),
            bread: catalog.add_food_item(new_food("Bread", "grain", 3.0, 15.0, 1.0)).unwrap(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn lunch(f: &Fixture) -> Meal {
        let mut meal = MealShellRegistry::default()
            .create(MealTypeKind::Lunch, f.user_id, date())
            .unwrap();
        meal.add_food_item(f.apple.clone(), 1.0).unwrap();
        meal.add_food_item(f.bread.clone(), 2.0).unwrap();
        meal.set_notes(Some("desk lunch".to_string()));
        meal
    }

    #[test]
    fn test_save_and_get_preserve_entry_order() {
        let f = fixture();
        let saved = f.meals.save(&lunch(&f), f.user_id).unwrap();
        let id = saved.id().unwrap();

        let loaded = f.meals.get(id).unwrap();
        assert_eq!(loaded.kind(), MealTypeKind::Lunch);
        assert_eq!(loaded.date(), date());
        assert_eq!(loaded.notes(), Some("desk lunch"));
        let names: Vec<&str> = loaded.entries().iter().map(|e| e.food_item.name()).collect();
        assert_eq!(names, vec!["Apple", "Bread"]);
        assert_eq!(loaded.entries()[1].quantity, 2.0);
        assert_eq!(
            f.meals.import_meal_food_ids(id).unwrap(),
            vec![f.apple.id(), f.bread.id()]
        );
    }

    #[test]
    fn test_update_replaces_entries() {
        let f = fixture();
        let mut meal = f.meals.save(&lunch(&f), f.user_id).unwrap();
        meal.remove_food_item(f.apple.id()).unwrap();
        meal.update_quantity(f.bread.id(), 3.0).unwrap();
        f.meals.update(&meal).unwrap();

        let loaded = f.meals.get(meal.id().unwrap()).unwrap();
        assert_eq!(loaded.entries().len(), 1);
        assert_eq!(loaded.entries()[0].quantity, 3.0);
    }

    #[test]
    fn test_soft_delete_hides_meal_and_frees_type() {
        let f = fixture();
        let id = f.meals.save(&lunch(&f), f.user_id).unwrap().id().unwrap();
        assert_eq!(f.meals.count_for_type(f.user_id, MealTypeKind::Lunch, date()).unwrap(), 1);
        assert!(!f
            .meals
            .available_meal_types(f.user_id, date())
            .unwrap()
            .contains(&MealTypeKind::Lunch));

        assert!(f.meals.delete(id).unwrap());
        assert!(!f.meals.delete(id).unwrap());
        assert!(matches!(f.meals.get(id), Err(MealError::NotFound { .. })));
        assert!(matches!(
            f.meals.import_meal_food_ids(id),
            Err(MealError::NotFound { .. })
        ));
        assert_eq!(f.meals.count_for_type(f.user_id, MealTypeKind::Lunch, date()).unwrap(), 0);
        assert!(matches!(f.meals.update(&lunch(&f).with_id(id)), Err(MealError::NotFound { .. })));
    }

    #[test]
    fn test_meals_for_user_filters_range() {
        let f = fixture();
        f.meals.save(&lunch(&f), f.user_id).unwrap();
        let next_day = lunch(&f).duplicate_for(date().succ_opt().unwrap());
        f.meals.save(&next_day, f.user_id).unwrap();

        let single = f.meals.meals_for_user(f.user_id, DateRange::single_day(date())).unwrap();
        assert_eq!(single.len(), 1);
        let range = DateRange::new(date(), date().succ_opt().unwrap()).unwrap();
        let both = f.meals.meals_for_user(f.user_id, range).unwrap();
        assert_eq!(both.len(), 2);
        assert!(both[0].date() < both[1].date());
        assert!(f.meals.meals_for_user(f.user_id + 1, range).unwrap().is_empty());
    }

    #[test]
    fn test_save_rejects_wrong_owner() {
        let f = fixture();
        assert!(matches!(
            f.meals.save(&lunch(&f), f.user_id + 1),
            Err(MealError::Validation(_))
        ));
    }

    #[test]
    fn test_save_refuses_already_saved_meal() {
        let f = fixture();
        let saved = f.meals.save(&lunch(&f), f.user_id).unwrap();
        assert!(matches!(
            f.meals.save(&saved, f.user_id),
            Err(MealError::Validation(_))
        ));
        let range = DateRange::single_day(date());
        assert_eq!(f.meals.meals_for_user(f.user_id, range).unwrap().len(), 1);
    }
}

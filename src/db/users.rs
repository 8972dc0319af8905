//! SQLite user store
//!
//! Passwords are stored as bcrypt hashes; the goal is three nullable columns
//! that are written and cleared together.

use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use tracing::{info, warn};

use crate::error::{MealError, Result};
use crate::models::{Goal, NewUser, User};
use crate::repository::UserRepository;
use super::connection::{Database, DbError};

const USER_COLUMNS: &str =
    "id, email, display_name, goal_nutrient, goal_direction, goal_percent, created_at, updated_at";

struct UserRow {
    id: i64,
    email: String,
    display_name: String,
    goal_nutrient: Option<String>,
    goal_direction: Option<String>,
    goal_percent: Option<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            goal_nutrient: row.get(3)?,
            goal_direction: row.get(4)?,
            goal_percent: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let goal = match (self.goal_nutrient, self.goal_direction, self.goal_percent) {
            (Some(nutrient), Some(direction), Some(percent)) => {
                Some(Goal::parse(&nutrient, &direction, percent)?)
            }
            _ => None,
        };
        Ok(User {
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            goal,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// User repository backed by the SQLite pool
#[derive(Clone)]
pub struct SqliteUserRepository {
    db: Database,
    bcrypt_cost: u32,
}

impl SqliteUserRepository {
    pub fn new(db: Database, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    fn find_by_email(&self, email: &str) -> Result<Option<(UserRow, String)>> {
        Ok(self.db.with_conn(|conn| {
            let sql = format!("SELECT {}, password_hash FROM users WHERE email = ?1", USER_COLUMNS);
            Ok(conn
                .query_row(&sql, [email], |row| Ok((UserRow::from_row(row)?, row.get(8)?)))
                .optional()?)
        })?)
    }
}

impl UserRepository for SqliteUserRepository {
    fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let Some((row, hash)) = self.find_by_email(&email)? else {
            return Ok(None);
        };
        if !bcrypt::verify(password, &hash).map_err(DbError::from)? {
            warn!(email = %email, "authentication failed");
            return Ok(None);
        }
        row.into_user().map(Some)
    }

    fn save(&self, user: &NewUser) -> Result<User> {
        let email = user.validate()?;
        let password_hash = bcrypt::hash(&user.password, self.bcrypt_cost).map_err(DbError::from)?;
        let now = Utc::now();
        let display_name = user.display_name.trim().to_string();

        let inserted = self.db.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (email, display_name, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![email, display_name, password_hash, now, now],
            );
            match result {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                    Ok(None)
                }
                Err(err) => Err(err.into()),
            }
        })?;

        let id = inserted
            .ok_or_else(|| MealError::Validation(format!("Email already registered: {}", email)))?;
        info!(user_id = id, "user registered");
        Ok(User {
            id,
            email,
            display_name,
            goal: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_profile(&self, user: &User) -> Result<()> {
        let (nutrient, direction, percent) = match user.goal {
            Some(goal) => (
                Some(goal.nutrient.key()),
                Some(goal.direction.as_str()),
                Some(goal.percent.value()),
            ),
            None => (None, None, None),
        };
        let changed = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users
                 SET display_name = ?1, goal_nutrient = ?2, goal_direction = ?3, goal_percent = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![user.display_name.trim(), nutrient, direction, percent, Utc::now(), user.id],
            )?)
        })?;
        if changed == 0 {
            return Err(MealError::not_found("User", user.id));
        }
        Ok(())
    }

    fn get(&self, user_id: i64) -> Result<User> {
        self.db
            .with_conn(|conn| {
                let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                Ok(conn.query_row(&sql, [user_id], UserRow::from_row).optional()?)
            })?
            .ok_or_else(|| MealError::not_found("User", user_id))?
            .into_user()
    }
}

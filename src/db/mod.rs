//! Database module
//!
//! SQLite connection pooling, migrations, and the repository implementations.

pub mod connection;
pub mod food_catalog;
pub mod meals;
pub mod migrations;
pub mod users;

pub use connection::{Database, DbError, DbResult};
pub use food_catalog::SqliteFoodCatalog;
pub use meals::SqliteMealRepository;
pub use users::SqliteUserRepository;

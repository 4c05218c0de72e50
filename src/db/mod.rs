mod backend;
mod postgres;
pub mod sanitize;
mod sqlite;

pub use backend::{DatabaseBackend, SqlDialect};
pub use postgres::PostgresBackend;
pub use sanitize::{validate_collection_name, SqlSanitizeError};
pub use sqlite::SqliteBackend;

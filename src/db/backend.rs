use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{Document, FieldSet};

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
  Postgres,
  Sqlite,
}

impl SqlDialect {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Postgres => "postgres",
      Self::Sqlite => "sqlite",
    }
  }
}

/// Collection-oriented document store.
///
/// Identifiers are assigned by the backend on insert and never change. Writes
/// addressed to an identifier that does not exist are not errors: `update_fields`
/// and `delete` report whether anything matched and callers decide whether
/// that matters.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
  fn dialect(&self) -> SqlDialect;

  async fn init_schema(&self) -> Result<(), anyhow::Error>;

  async fn insert(&self, collection: &str, fields: FieldSet) -> Result<Document, anyhow::Error>;

  async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, anyhow::Error>;

  /// Merge `fields` into the stored record's top-level fields.
  /// Returns `false` when no record matched.
  async fn update_fields(
    &self,
    collection: &str,
    id: Uuid,
    fields: FieldSet,
  ) -> Result<bool, anyhow::Error>;

  /// Returns `false` when no record matched.
  async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, anyhow::Error>;

  /// Every record in the collection, oldest first.
  async fn list(&self, collection: &str) -> Result<Vec<Document>, anyhow::Error>;
}

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use super::backend::{DatabaseBackend, SqlDialect};
use super::sanitize::validate_collection_name;
use crate::types::{Document, FieldSet};

// `seq` records insertion order; timestamps can tie within a microsecond.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    seq BIGSERIAL NOT NULL,
    collection VARCHAR(255) NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ DEFAULT NOW(),
    updated_at TIMESTAMPTZ DEFAULT NOW()
);
ALTER TABLE documents ADD COLUMN IF NOT EXISTS seq BIGSERIAL;
CREATE INDEX IF NOT EXISTS idx_documents_collection_seq ON documents(collection, seq);
"#;

const COLUMNS: &str = "id, collection, data, created_at, updated_at";

pub struct PostgresBackend {
  pool: Pool,
}

impl PostgresBackend {
  pub fn new(url: &str, max_connections: usize) -> Result<Self, anyhow::Error> {
    let mut cfg = Config::new();
    cfg.url = Some(url.into());
    cfg.manager = Some(ManagerConfig {
      recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections.max(1)));
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(Self { pool })
  }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Postgres
  }

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self.pool.get().await?.batch_execute(SCHEMA).await?;
    tracing::info!("PostgreSQL schema initialized");
    Ok(())
  }

  async fn insert(&self, collection: &str, fields: FieldSet) -> Result<Document, anyhow::Error> {
    validate_collection_name(collection)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let data = fields.into_value();
    self.pool.get().await?.execute(
      "INSERT INTO documents (id, collection, data, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
      &[&id, &collection, &data, &now, &now],
    ).await?;
    Ok(Document {
      id,
      collection: collection.into(),
      data,
      created_at: now,
      updated_at: now,
    })
  }

  async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let sql = format!("SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2");
    let row = self
      .pool
      .get()
      .await?
      .query_opt(&sql, &[&collection, &id])
      .await?;
    Ok(row.as_ref().map(row_to_doc))
  }

  async fn update_fields(
    &self,
    collection: &str,
    id: Uuid,
    fields: FieldSet,
  ) -> Result<bool, anyhow::Error> {
    validate_collection_name(collection)?;

    // jsonb `||` replaces top-level keys and keeps the rest.
    let now = Utc::now();
    let patch = fields.into_value();
    let changed = self
      .pool
      .get()
      .await?
      .execute(
        "UPDATE documents SET data = data || $1::jsonb, updated_at = $2 WHERE collection = $3 AND id = $4",
        &[&patch, &now, &collection, &id],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, anyhow::Error> {
    validate_collection_name(collection)?;

    let removed = self
      .pool
      .get()
      .await?
      .execute(
        "DELETE FROM documents WHERE collection = $1 AND id = $2",
        &[&collection, &id],
      )
      .await?;
    Ok(removed > 0)
  }

  async fn list(&self, collection: &str) -> Result<Vec<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let rows = self
      .pool
      .get()
      .await?
      .query(&list_sql(), &[&collection])
      .await?;
    Ok(rows.iter().map(row_to_doc).collect())
  }
}

fn list_sql() -> String {
  format!("SELECT {COLUMNS} FROM documents WHERE collection = $1 ORDER BY seq")
}

fn row_to_doc(r: &Row) -> Document {
  Document {
    id: r.get(0),
    collection: r.get(1),
    data: r.get(2),
    created_at: r.get(3),
    updated_at: r.get(4),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_schema_tracks_insertion_sequence() {
    assert!(SCHEMA.contains("seq BIGSERIAL NOT NULL"));
    assert!(SCHEMA.contains("ADD COLUMN IF NOT EXISTS seq BIGSERIAL"));
    assert!(SCHEMA.contains("ON documents(collection, seq)"));
    assert!(list_sql().ends_with("ORDER BY seq"));
  }

  #[tokio::test]
  async fn test_pool_builds_without_connecting() {
    let backend = PostgresBackend::new("postgres://localhost/doctrack_unused", 0).unwrap();
    assert_eq!(backend.dialect(), SqlDialect::Postgres);
    assert_eq!(backend.pool.status().max_size, 1);
  }
}

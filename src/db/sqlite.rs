use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::backend::{DatabaseBackend, SqlDialect};
use super::sanitize::validate_collection_name;
use crate::types::{Document, FieldSet};

const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
PRAGMA temp_store = MEMORY;
"#;

// Rowid order doubles as insertion order for listing.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

pub struct SqliteBackend {
  conn: Connection,
}

impl SqliteBackend {
  pub async fn new(path: &str) -> Result<Self, anyhow::Error> {
    let conn = if path == ":memory:" {
      Connection::open_in_memory().await?
    } else {
      Connection::open(path).await?
    };

    conn
      .call(|conn| conn.execute_batch(PRAGMAS).map_err(|e| e.into()))
      .await?;

    Ok(Self { conn })
  }

  pub async fn in_memory() -> Result<Self, anyhow::Error> {
    Self::new(":memory:").await
  }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Sqlite
  }

  async fn init_schema(&self) -> Result<(), anyhow::Error> {
    self
      .conn
      .call(|conn| conn.execute_batch(SCHEMA).map_err(|e| e.into()))
      .await?;
    tracing::info!("SQLite schema initialized");
    Ok(())
  }

  async fn insert(&self, collection: &str, fields: FieldSet) -> Result<Document, anyhow::Error> {
    validate_collection_name(collection)?;

    let id = Uuid::new_v4();
    let now = Utc::now();
    let data = fields.into_value();
    let data_str = serde_json::to_string(&data)?;
    let now_str = now.to_rfc3339();
    let col = collection.to_string();
    let id_str = id.to_string();

    self.conn.call(move |conn| {
      conn.execute(
        "INSERT INTO documents (id, collection, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id_str, col, data_str, now_str, now_str],
      ).map_err(|e| e.into())
    }).await?;

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

    let col = collection.to_string();
    let id_str = id.to_string();

    self
      .conn
      .call(move |conn| {
        conn
          .query_row(
            "SELECT id, collection, data, created_at, updated_at FROM documents WHERE collection = ?1 AND id = ?2",
            params![col, id_str],
            row_to_doc,
          )
          .optional()
          .map_err(|e| e.into())
      })
      .await
      .map_err(|e| anyhow::anyhow!("{}", e))
  }

  async fn update_fields(
    &self,
    collection: &str,
    id: Uuid,
    fields: FieldSet,
  ) -> Result<bool, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();
    let id_str = id.to_string();
    let now_str = Utc::now().to_rfc3339();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![col, id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(existing) = existing else {
          return Ok(false);
        };

        let mut data: serde_json::Value = serde_json::from_str(&existing)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        fields.merge_into(&mut data);
        let data_str =
          serde_json::to_string(&data).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        tx.execute(
          "UPDATE documents SET data = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
          params![data_str, now_str, col, id_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(|e| anyhow::anyhow!("{}", e))
  }

  async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();
    let id_str = id.to_string();

    self
      .conn
      .call(move |conn| {
        let removed = conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
          params![col, id_str],
        )?;
        Ok(removed > 0)
      })
      .await
      .map_err(|e| anyhow::anyhow!("{}", e))
  }

  async fn list(&self, collection: &str) -> Result<Vec<Document>, anyhow::Error> {
    validate_collection_name(collection)?;

    let col = collection.to_string();

    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT id, collection, data, created_at, updated_at FROM documents WHERE collection = ?1 ORDER BY rowid",
        )?;
        let mut rows = stmt.query(params![col])?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
          docs.push(row_to_doc(row)?);
        }
        Ok(docs)
      })
      .await
      .map_err(|e| anyhow::anyhow!("{}", e))
  }
}

fn row_to_doc(row: &rusqlite::Row) -> Result<Document, rusqlite::Error> {
  let id_str: String = row.get(0)?;
  let data_str: String = row.get(2)?;
  let created_str: String = row.get(3)?;
  let updated_str: String = row.get(4)?;
  Ok(Document {
    id: id_str.parse().unwrap_or_default(),
    collection: row.get(1)?,
    data: serde_json::from_str(&data_str).unwrap_or(serde_json::Value::Null),
    created_at: parse_timestamp(&created_str),
    updated_at: parse_timestamp(&updated_str),
  })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|d| d.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fields::ID_FIELD;

/// Collection holding caller-managed documents.
pub const DOCUMENTS: &str = "documents";

/// Collection holding archived records. Read-only over HTTP.
pub const ARCHIVES: &str = "archives";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub id: Uuid,
  pub collection: String,
  pub data: serde_json::Value,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Document {
  /// Flatten into the wire shape: the stored fields plus `_id`.
  ///
  /// Timestamps and the collection name stay server-side so that a record
  /// read back over HTTP matches what the caller wrote, field for field.
  pub fn to_record(&self) -> serde_json::Value {
    let mut record = serde_json::Map::new();
    record.insert(
      ID_FIELD.to_string(),
      serde_json::Value::String(self.id.to_string()),
    );
    if let serde_json::Value::Object(fields) = &self.data {
      for (name, value) in fields {
        record.insert(name.clone(), value.clone());
      }
    }
    serde_json::Value::Object(record)
  }
}

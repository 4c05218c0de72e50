//! Sparse field-sets parsed from client payloads.
//!
//! A payload is the `document` part of an upsert request: a JSON object whose
//! top-level keys are caller fields, optionally carrying the identifier of the
//! record to update. The identifier is split off here so the store only ever
//! sees plain fields.

use serde_json::{Map, Value};
use uuid::Uuid;

/// Wire name of the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// Field set by the server when a file is attached.
pub const ATTACHMENT_FIELD: &str = "attachmentPath";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldSetError {
  #[error("Malformed document payload: {0}")]
  Malformed(String),
  #[error("Document payload must be a JSON object")]
  NotAnObject,
  #[error("Field name cannot be empty")]
  EmptyFieldName,
  #[error("Invalid field name '{0}'")]
  InvalidFieldName(String),
  #[error("Invalid document identifier: {0}")]
  InvalidIdentifier(String),
}

/// Mapping of top-level field name to new value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet(Map<String, Value>);

impl FieldSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a field-set from a JSON object, validating every field name.
  pub fn from_map(map: Map<String, Value>) -> Result<Self, FieldSetError> {
    for name in map.keys() {
      validate_field_name(name)?;
    }
    Ok(Self(map))
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.0.get(name)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
    self.0.iter()
  }

  /// Record where an uploaded attachment was staged, replacing any prior path.
  pub fn set_attachment_path(&mut self, path: impl Into<String>) {
    self
      .0
      .insert(ATTACHMENT_FIELD.to_string(), Value::String(path.into()));
  }

  /// Apply these fields on top of `target`, leaving other keys untouched.
  pub fn merge_into(&self, target: &mut Value) {
    if !target.is_object() {
      *target = Value::Object(Map::new());
    }
    if let Value::Object(existing) = target {
      for (name, value) in &self.0 {
        existing.insert(name.clone(), value.clone());
      }
    }
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.0)
  }
}

/// A parsed upsert payload: the target identifier, if any, and the fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPayload {
  pub id: Option<Uuid>,
  pub fields: FieldSet,
}

impl DocumentPayload {
  pub fn parse(raw: &str) -> Result<Self, FieldSetError> {
    let value: Value =
      serde_json::from_str(raw).map_err(|e| FieldSetError::Malformed(e.to_string()))?;
    Self::from_value(value)
  }

  pub fn from_value(value: Value) -> Result<Self, FieldSetError> {
    let Value::Object(mut map) = value else {
      return Err(FieldSetError::NotAnObject);
    };

    let id = take_identifier(&mut map, ID_FIELD)?;

    Ok(Self {
      id,
      fields: FieldSet::from_map(map)?,
    })
  }
}

/// Remove an identifier key, treating null and empty strings as absent.
fn take_identifier(map: &mut Map<String, Value>, key: &str) -> Result<Option<Uuid>, FieldSetError> {
  match map.remove(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) if s.is_empty() => Ok(None),
    Some(Value::String(s)) => Uuid::parse_str(&s)
      .map(Some)
      .map_err(|_| FieldSetError::InvalidIdentifier(s)),
    Some(other) => Err(FieldSetError::InvalidIdentifier(other.to_string())),
  }
}

fn validate_field_name(name: &str) -> Result<(), FieldSetError> {
  if name.is_empty() {
    return Err(FieldSetError::EmptyFieldName);
  }
  if name.starts_with('$') || name.contains('.') || name.contains('\0') {
    return Err(FieldSetError::InvalidFieldName(name.to_string()));
  }
  Ok(())
}

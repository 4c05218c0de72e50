//! Collection name checks applied before any statement touches the store.

/// Maximum length for collection names
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Validates a collection name: lowercase alphanumeric and underscore,
/// starting with a letter or underscore.
pub fn validate_collection_name(s: &str) -> Result<(), SqlSanitizeError> {
  let Some(first) = s.chars().next() else {
    return Err(SqlSanitizeError::EmptyIdentifier);
  };

  if s.len() > MAX_IDENTIFIER_LENGTH {
    return Err(SqlSanitizeError::IdentifierTooLong(s.len()));
  }

  if !first.is_ascii_alphabetic() && first != '_' {
    return Err(SqlSanitizeError::InvalidIdentifierStart(first));
  }

  if let Some(c) = s
    .chars()
    .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '_')
  {
    return Err(SqlSanitizeError::InvalidCollectionChar(c));
  }

  Ok(())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SqlSanitizeError {
  #[error("Identifier cannot be empty")]
  EmptyIdentifier,
  #[error("Identifier too long: {0} > 255")]
  IdentifierTooLong(usize),
  #[error("Identifier must start with letter or underscore, got '{0}'")]
  InvalidIdentifierStart(char),
  #[error("Invalid character in collection name: '{0}'")]
  InvalidCollectionChar(char),
}

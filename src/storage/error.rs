use std::path::PathBuf;

/// Staging area failures
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Attachment of {size} bytes exceeds the {limit} byte limit")]
  TooLarge { size: u64, limit: u64 },
  #[error("Path {0} is outside the staging area")]
  OutsideStagingArea(PathBuf),
}

impl StagingError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }
}

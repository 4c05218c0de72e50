use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::error::StagingError;

/// A file written to the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
  /// Path recorded on the document, relative to the process if the base is.
  pub path: String,
  pub size: u64,
}

/// Local directory receiving uploaded attachments.
///
/// Files are stored flat under generated names with no extension. Nothing here
/// expires or garbage-collects files: a superseded or orphaned attachment stays
/// on disk until removed out of band.
pub struct StagingArea {
  base_path: PathBuf,
  max_file_size: u64,
}

impl StagingArea {
  pub fn new(base_path: impl AsRef<Path>, max_file_size: u64) -> Self {
    Self {
      base_path: base_path.as_ref().to_path_buf(),
      max_file_size,
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  /// Create the staging directory if missing.
  pub async fn init(&self) -> Result<(), StagingError> {
    fs::create_dir_all(&self.base_path)
      .await
      .map_err(|e| StagingError::io(&self.base_path, e))
  }

  /// Write `data` under a fresh name and return where it landed.
  pub async fn stage(&self, data: &[u8]) -> Result<StagedFile, StagingError> {
    let size = data.len() as u64;
    if size > self.max_file_size {
      return Err(StagingError::TooLarge {
        size,
        limit: self.max_file_size,
      });
    }

    let path = self.base_path.join(Self::generate_name());

    let mut file = File::create(&path)
      .await
      .map_err(|e| StagingError::io(&path, e))?;
    file
      .write_all(data)
      .await
      .map_err(|e| StagingError::io(&path, e))?;
    file.flush().await.map_err(|e| StagingError::io(&path, e))?;

    tracing::debug!("Staged {} bytes at {}", size, path.display());

    Ok(StagedFile {
      path: path.to_string_lossy().into_owned(),
      size,
    })
  }

  /// Remove a previously staged file. Missing files are not an error.
  pub async fn discard(&self, staged_path: &str) -> Result<(), StagingError> {
    let path = Path::new(staged_path);
    if path.parent() != Some(self.base_path.as_path()) {
      return Err(StagingError::OutsideStagingArea(path.to_path_buf()));
    }
    match fs::remove_file(path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(StagingError::io(path, e)),
    }
  }

  /// 32 lowercase hex characters.
  fn generate_name() -> String {
    Uuid::new_v4().simple().to_string()
  }
}

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use crate::db::DatabaseBackend;

/// Connection state of the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
  Connecting,
  Ready,
  Failed(String),
}

impl StoreStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Connecting => "connecting",
      Self::Ready => "ready",
      Self::Failed(_) => "failed",
    }
  }
}

/// Readiness gate in front of the document store.
///
/// The backend is connected in the background after the listener is up.
/// Handlers ask the gate for it on every request and fail fast while it is
/// missing. Once published the backend never changes.
pub struct StoreGate {
  backend: OnceLock<Arc<dyn DatabaseBackend>>,
  status: RwLock<StoreStatus>,
}

impl StoreGate {
  pub fn new() -> Self {
    Self {
      backend: OnceLock::new(),
      status: RwLock::new(StoreStatus::Connecting),
    }
  }

  /// A gate that is open from the start.
  pub fn ready(backend: Arc<dyn DatabaseBackend>) -> Self {
    let gate = Self::new();
    gate.publish(backend);
    gate
  }

  /// Open the gate. Returns `false` if a backend was already published.
  pub fn publish(&self, backend: Arc<dyn DatabaseBackend>) -> bool {
    let dialect = backend.dialect();
    if self.backend.set(backend).is_err() {
      tracing::warn!("Document store already published, ignoring");
      return false;
    }
    *self.status.write() = StoreStatus::Ready;
    tracing::info!("Document store ready ({})", dialect.as_str());
    true
  }

  /// Record that connecting failed. No-op once the gate is open.
  pub fn mark_failed(&self, reason: impl Into<String>) {
    if self.backend.get().is_some() {
      return;
    }
    let reason = reason.into();
    tracing::error!("Document store unavailable: {}", reason);
    *self.status.write() = StoreStatus::Failed(reason);
  }

  pub fn backend(&self) -> Option<Arc<dyn DatabaseBackend>> {
    self.backend.get().cloned()
  }

  pub fn status(&self) -> StoreStatus {
    self.status.read().clone()
  }
}

impl Default for StoreGate {
  fn default() -> Self {
    Self::new()
  }
}

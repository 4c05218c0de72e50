use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::{Deserialize, Serialize};

/// Flat `{message}` body returned by every document endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
  pub message: String,
}

impl MessageResponse {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// The document operations exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Fetch,
  Save,
  Delete,
}

impl Operation {
  pub fn failure_message(&self) -> &'static str {
    match self {
      Self::Fetch => "Error fetching data",
      Self::Save => "Error saving document",
      Self::Delete => "Error deleting document",
    }
  }
}

/// Handler failure.
///
/// Callers only ever see the operation's failure message; the cause is logged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("Document store not ready")]
  NotReady,
  #[error("{}: {cause:#}", .operation.failure_message())]
  Failed {
    operation: Operation,
    cause: anyhow::Error,
  },
}

impl ApiError {
  pub fn failed(operation: Operation, cause: impl Into<anyhow::Error>) -> Self {
    Self::Failed {
      operation,
      cause: cause.into(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
      Self::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      Self::NotReady => "Document store not ready",
      Self::Failed { operation, .. } => operation.failure_message(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      Self::NotReady => tracing::warn!("Rejected request: document store not ready"),
      Self::Failed { .. } => tracing::error!("{}", self),
    }
    (self.status(), Json(MessageResponse::new(self.message()))).into_response()
  }
}

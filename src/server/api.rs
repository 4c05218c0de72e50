use axum::{
  body::Bytes,
  extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
  routing::{delete, get},
  Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::error::{ApiError, MessageResponse, Operation};
use super::gate::{StoreGate, StoreStatus};
use super::ServerConfig;
use crate::db::DatabaseBackend;
use crate::storage::StagingArea;
use crate::types::{Document, DocumentPayload, ARCHIVES, DOCUMENTS};

/// Multipart part carrying the serialized document.
pub const DOCUMENT_PART: &str = "document";

/// Multipart part carrying the optional file.
pub const ATTACHMENT_PART: &str = "attachment";

const SAVED_MESSAGE: &str = "Document saved successfully";
const DELETED_MESSAGE: &str = "Document deleted successfully";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
  pub gate: Arc<StoreGate>,
  pub staging: Arc<StagingArea>,
}

impl AppState {
  fn backend(&self) -> Result<Arc<dyn DatabaseBackend>, ApiError> {
    self.gate.backend().ok_or(ApiError::NotReady)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsResponse {
  pub documents: Vec<serde_json::Value>,
  pub archives: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
  pub status: String,
  pub store: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
  let cors = if config.server.cors_origins.is_empty()
    || config.server.cors_origins.iter().any(|o| o == "*")
  {
    CorsLayer::permissive()
  } else {
    let origins: Vec<_> = config
      .server
      .cors_origins
      .iter()
      .filter_map(|o| o.parse().ok())
      .collect();
    CorsLayer::new()
      .allow_origin(origins)
      .allow_methods(Any)
      .allow_headers(Any)
  };

  let app = Router::new()
    .route("/api/documents", get(list_documents).post(save_document))
    .route("/api/documents/{id}", delete(delete_document))
    .route("/health", get(health))
    .layer(DefaultBodyLimit::max(config.uploads.max_upload_size))
    .with_state(state);

  let app = match &config.server.static_dir {
    Some(dir) => app.fallback_service(ServeDir::new(dir)),
    None => app,
  };

  app.layer(cors).layer(TraceLayer::new_for_http())
}

/// GET /api/documents - every document and archive, oldest first.
///
/// Both collections are read concurrently; if either read fails the whole
/// request fails and nothing partial is returned.
async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentsResponse>, ApiError> {
  let backend = state.backend()?;

  let (documents, archives) = tokio::try_join!(backend.list(DOCUMENTS), backend.list(ARCHIVES))
    .map_err(|e| ApiError::failed(Operation::Fetch, e))?;

  Ok(Json(DocumentsResponse {
    documents: documents.iter().map(Document::to_record).collect(),
    archives: archives.iter().map(Document::to_record).collect(),
  }))
}

/// POST /api/documents - insert, or merge into an existing document.
///
/// A payload carrying an identifier updates only the fields it names. A
/// payload without one is inserted and the store assigns the identifier,
/// which is not echoed back. An unmatched identifier is a silent no-op; an
/// identifier with nothing to set is rejected.
async fn save_document(
  State(state): State<AppState>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
  let backend = state.backend()?;
  let fail = |e: anyhow::Error| ApiError::failed(Operation::Save, e);

  let form = read_upload_form(multipart.map_err(|e| fail(e.into()))?)
    .await
    .map_err(fail)?;
  let raw = form
    .document
    .ok_or_else(|| fail(anyhow::anyhow!("missing '{}' part", DOCUMENT_PART)))?;
  let DocumentPayload { id, mut fields } =
    DocumentPayload::parse(&raw).map_err(|e| fail(e.into()))?;

  let staged = match form.attachment {
    Some(data) => {
      let file = state.staging.stage(&data).await.map_err(|e| fail(e.into()))?;
      fields.set_attachment_path(file.path.clone());
      Some(file)
    }
    None => None,
  };

  if id.is_some() && fields.is_empty() {
    return Err(fail(anyhow::anyhow!("update names no fields")));
  }

  let written = match id {
    Some(id) => backend
      .update_fields(DOCUMENTS, id, fields)
      .await
      .map(|matched| {
        if !matched {
          tracing::debug!("Update matched no document {}", id);
        }
      }),
    None => backend
      .insert(DOCUMENTS, fields)
      .await
      .map(|doc| tracing::debug!("Inserted document {}", doc.id)),
  };

  if let Err(e) = written {
    // The record write failed after the file landed; drop the file so it
    // is not left without an owner.
    if let Some(file) = &staged {
      match state.staging.discard(&file.path).await {
        Ok(()) => tracing::info!("Removed orphaned attachment {}", file.path),
        Err(err) => tracing::warn!("Failed to remove orphaned attachment {}: {}", file.path, err),
      }
    }
    return Err(fail(e));
  }

  Ok(Json(MessageResponse::new(SAVED_MESSAGE)))
}

/// DELETE /api/documents/{id} - succeeds whether or not the document existed.
async fn delete_document(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
  let backend = state.backend()?;

  let id = Uuid::parse_str(&id).map_err(|e| ApiError::failed(Operation::Delete, e))?;
  let removed = backend
    .delete(DOCUMENTS, id)
    .await
    .map_err(|e| ApiError::failed(Operation::Delete, e))?;
  if !removed {
    tracing::debug!("Delete matched no document {}", id);
  }

  Ok(Json(MessageResponse::new(DELETED_MESSAGE)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
  let status = state.gate.status();
  let reason = match &status {
    StoreStatus::Failed(reason) => Some(reason.clone()),
    _ => None,
  };
  Json(HealthResponse {
    status: "ok".into(),
    store: status.as_str().into(),
    reason,
  })
}

#[derive(Default)]
struct UploadForm {
  document: Option<String>,
  attachment: Option<Bytes>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, anyhow::Error> {
  let mut form = UploadForm::default();

  while let Some(field) = multipart.next_field().await? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some(DOCUMENT_PART) => form.document = Some(field.text().await?),
      Some(ATTACHMENT_PART) => {
        // Browsers submit an unnamed empty part for an untouched file input.
        let named = field.file_name().is_some_and(|n| !n.is_empty());
        let data = field.bytes().await?;
        if !named && data.is_empty() {
          continue;
        }
        if form.attachment.is_some() {
          tracing::warn!("Ignoring extra '{}' part", ATTACHMENT_PART);
          continue;
        }
        form.attachment = Some(data);
      }
      other => tracing::debug!("Ignoring multipart part {:?}", other),
    }
  }

  Ok(form)
}

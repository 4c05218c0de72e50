pub mod api;
mod config;
mod daemon;
pub mod error;
mod gate;

pub use api::{build_router, AppState, DocumentsResponse, HealthResponse};
pub use config::{
  BackendType, LoggingSection, PostgresSection, ServerConfig, ServerSection, SqliteSection,
  UploadsSection,
};
pub use daemon::{open_backend, Daemon};
pub use error::{ApiError, MessageResponse, Operation};
pub use gate::{StoreGate, StoreStatus};

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use super::api::{build_router, AppState};
use super::{BackendType, ServerConfig, StoreGate};
use crate::db::{DatabaseBackend, PostgresBackend, SqliteBackend};
use crate::storage::StagingArea;

/// Connect the configured backend and make sure its schema exists.
pub async fn open_backend(config: &ServerConfig) -> Result<Arc<dyn DatabaseBackend>, anyhow::Error> {
  let backend: Arc<dyn DatabaseBackend> = match config.backend {
    BackendType::Postgres => Arc::new(PostgresBackend::new(
      &config.postgres.url,
      config.postgres.max_connections,
    )?),
    BackendType::Sqlite => Arc::new(SqliteBackend::new(&config.sqlite.path).await?),
  };
  backend.init_schema().await?;
  Ok(backend)
}

pub struct Daemon {
  config: ServerConfig,
  gate: Arc<StoreGate>,
  shutdown_tx: broadcast::Sender<()>,
}

impl Daemon {
  pub fn new(config: ServerConfig) -> Self {
    let (shutdown_tx, _) = broadcast::channel(1);
    Self {
      config,
      gate: Arc::new(StoreGate::new()),
      shutdown_tx,
    }
  }

  /// Trigger graceful shutdown of the HTTP server
  pub fn shutdown(&self) {
    tracing::info!("Initiating graceful shutdown...");
    let _ = self.shutdown_tx.send(());
  }

  pub async fn run(&self) -> Result<(), anyhow::Error> {
    let staging = StagingArea::new(
      &self.config.uploads.path,
      self.config.uploads.max_upload_size as u64,
    );
    staging.init().await?;
    tracing::info!("Staging attachments in {}", staging.base_path().display());

    // The listener comes up before the store; requests in between get 503.
    let gate = self.gate.clone();
    let config = self.config.clone();
    tokio::spawn(async move {
      tracing::info!("Connecting to {:?} document store...", config.backend);
      match open_backend(&config).await {
        Ok(backend) => {
          gate.publish(backend);
        }
        Err(e) => gate.mark_failed(format!("{:#}", e)),
      }
    });

    let state = AppState {
      gate: self.gate.clone(),
      staging: Arc::new(staging),
    };
    let app = build_router(state, &self.config);

    let addr = self.config.address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("doctrack listening on http://{}", addr);
    if let Some(dir) = &self.config.server.static_dir {
      tracing::info!("Serving static assets from {}", dir);
    }

    let mut shutdown_rx = self.shutdown_tx.subscribe();
    axum::serve(listener, app)
      .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
      })
      .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
  }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Expand `$VAR` and `${VAR}` references. Unset variables expand to "".
fn expand_env_vars(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut rest = input;

  while let Some(pos) = rest.find('$') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    if let Some(braced) = after.strip_prefix('{') {
      if let Some(end) = braced.find('}') {
        out.push_str(&std::env::var(&braced[..end]).unwrap_or_default());
        rest = &braced[end + 1..];
        continue;
      }
      out.push('$');
      rest = after;
      continue;
    }

    let name_len = after
      .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
      .unwrap_or(after.len());
    if name_len == 0 {
      out.push('$');
    } else {
      out.push_str(&std::env::var(&after[..name_len]).unwrap_or_default());
    }
    rest = &after[name_len..];
  }

  out.push_str(rest);
  out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
  Postgres,
  #[default]
  Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
  #[serde(default)]
  pub server: ServerSection,
  #[serde(default)]
  pub backend: BackendType,
  #[serde(default)]
  pub postgres: PostgresSection,
  #[serde(default)]
  pub sqlite: SqliteSection,
  #[serde(default)]
  pub uploads: UploadsSection,
  #[serde(default)]
  pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  /// Directory served for every path outside the API (the client UI)
  #[serde(default)]
  pub static_dir: Option<String>,
  /// CORS allowed origins. `["*"]` or an empty list means permissive.
  #[serde(default = "default_cors_origins")]
  pub cors_origins: Vec<String>,
}

fn default_host() -> String {
  "0.0.0.0".into()
}
fn default_port() -> u16 {
  3000
}
fn default_cors_origins() -> Vec<String> {
  vec!["*".to_string()]
}

impl Default for ServerSection {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      static_dir: None,
      cors_origins: default_cors_origins(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSection {
  #[serde(default = "default_pg_url")]
  pub url: String,
  #[serde(default = "default_max_conn")]
  pub max_connections: usize,
}
fn default_pg_url() -> String {
  "postgres://localhost/doctrack".into()
}
fn default_max_conn() -> usize {
  20
}
impl Default for PostgresSection {
  fn default() -> Self {
    Self {
      url: default_pg_url(),
      max_connections: default_max_conn(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteSection {
  #[serde(default = "default_sqlite_path")]
  pub path: String,
}
fn default_sqlite_path() -> String {
  "doctrack.db".into()
}
impl Default for SqliteSection {
  fn default() -> Self {
    Self {
      path: default_sqlite_path(),
    }
  }
}

/// Attachment staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsSection {
  /// Directory receiving uploaded attachments
  #[serde(default = "default_uploads_path")]
  pub path: String,
  /// Maximum request body size in bytes, attachment included
  #[serde(default = "default_max_upload_size")]
  pub max_upload_size: usize,
}
fn default_uploads_path() -> String {
  "uploads".into()
}
fn default_max_upload_size() -> usize {
  16 * 1024 * 1024 // 16 MB
}
impl Default for UploadsSection {
  fn default() -> Self {
    Self {
      path: default_uploads_path(),
      max_upload_size: default_max_upload_size(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
  #[serde(default = "default_level")]
  pub level: String,
}
fn default_level() -> String {
  "info".into()
}
impl Default for LoggingSection {
  fn default() -> Self {
    Self {
      level: default_level(),
    }
  }
}

impl ServerConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
    let content = std::fs::read_to_string(&path)?;
    Self::from_yaml(&content)
  }

  pub fn from_yaml(content: &str) -> Result<Self, anyhow::Error> {
    Ok(serde_yaml::from_str(&expand_env_vars(content))?)
  }

  pub fn find_and_load() -> Result<Option<Self>, anyhow::Error> {
    for p in ["doctrack.yaml", "doctrack.yml"] {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }

  pub fn address(&self) -> String {
    format!("{}:{}", self.server.host, self.server.port)
  }
}

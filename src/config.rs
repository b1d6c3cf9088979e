//! Configuration loading and management.
//!
//! Lookup order: explicit `--config` file, `./collectify.yaml`,
//! `~/.collectify/config.yaml`, then built-in defaults. `COLLECTIFY_*`
//! environment variables are applied on top, and CLI flags last.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub worksheets: WorksheetsConfig,
}

/// HTTP dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the dashboard binds on 127.0.0.1.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How long worksheet reads are memoized, in seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_port() -> u16 {
    8501
}

fn default_cache_ttl() -> u64 {
    60
}

/// Which spreadsheet backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local SQLite workbook.
    #[default]
    Sqlite,
    /// Hosted Google Sheets spreadsheet.
    GoogleSheets,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Path to the SQLite workbook file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Spreadsheet holding the catalog and prompt worksheets.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Spreadsheet holding the todo worksheet, if different.
    #[serde(default)]
    pub todo_spreadsheet_id: Option<String>,

    /// Static bearer token for the Sheets API.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Sheets API root.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            db_path: default_db_path(),
            spreadsheet_id: None,
            todo_spreadsheet_id: None,
            access_token: None,
            api_base: default_api_base(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".collectify/workbook.db")
}

fn default_api_base() -> String {
    crate::sheet::SHEETS_API_BASE.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Worksheet titles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetsConfig {
    #[serde(default = "default_catalog_sheet")]
    pub catalog: String,

    #[serde(default = "default_prompts_sheet")]
    pub prompts: String,

    #[serde(default = "default_todo_sheet")]
    pub todo: String,
}

impl Default for WorksheetsConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_sheet(),
            prompts: default_prompts_sheet(),
            todo: default_todo_sheet(),
        }
    }
}

fn default_catalog_sheet() -> String {
    "collectify_data".to_string()
}

fn default_prompts_sheet() -> String {
    "ChatGPT Prompts".to_string()
}

fn default_todo_sheet() -> String {
    "Todo".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from the explicit path, else the default locations, else defaults,
    /// then apply environment overrides.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::default_locations()
                .into_iter()
                .find(|p| p.is_file())
                .map(Self::load)
                .transpose()?
                .unwrap_or_default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("collectify.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".collectify").join("config.yaml"));
        }
        paths
    }

    /// Apply `COLLECTIFY_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("COLLECTIFY_DB_PATH") {
            self.backend.db_path = PathBuf::from(db_path);
        }
        if let Some(id) = lookup("COLLECTIFY_SPREADSHEET_ID") {
            self.backend.spreadsheet_id = Some(id);
            self.backend.kind = BackendKind::GoogleSheets;
        }
        if let Some(id) = lookup("COLLECTIFY_TODO_SPREADSHEET_ID") {
            self.backend.todo_spreadsheet_id = Some(id);
        }
        if let Some(token) = lookup("COLLECTIFY_SHEETS_TOKEN") {
            self.backend.access_token = Some(token);
        }
        if let Some(port) = lookup("COLLECTIFY_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(ttl) = lookup("COLLECTIFY_CACHE_TTL").and_then(|t| t.parse().ok()) {
            self.server.cache_ttl_seconds = ttl;
        }
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.server.cache_ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds.max(1))
    }

    /// Ensure the workbook directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.backend.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

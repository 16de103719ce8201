//! Configuration file support
//!
//! Handles parsing of `.despesas.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::ColumnMap;
use crate::ingest::reader::DEFAULT_BATCH_SIZE;
use crate::store::DEFAULT_TABLE;

/// Default database filename
pub const DEFAULT_DB_FILENAME: &str = "despesas.duckdb";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".despesas.toml";

/// Environment variable for the database path
pub const ENV_DB_PATH: &str = "DESPESAS_DB_PATH";

/// Environment variable for the table name
pub const ENV_TABLE: &str = "DESPESAS_TABLE";

/// Environment variable for the source directory
pub const ENV_SOURCE_DIR: &str = "DESPESAS_SOURCE_DIR";

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Store configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    /// Path to the DuckDB database file (relative to workspace, or absolute)
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Table holding the ingested records
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_db_path() -> String {
    DEFAULT_DB_FILENAME.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            table: default_table(),
        }
    }
}

/// Ingestion configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSection {
    /// Directory holding the Parquet files
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Glob tried first
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Glob used when `pattern` matches nothing
    #[serde(default = "default_fallback_pattern")]
    pub fallback_pattern: Option<String>,

    /// Rows decoded per chunk when reading a row-group
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_source_dir() -> String {
    "data".to_string()
}

fn default_pattern() -> String {
    "*.crc".to_string()
}

fn default_fallback_pattern() -> Option<String> {
    Some("*.parquet".to_string())
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            pattern: default_pattern(),
            fallback_pattern: default_fallback_pattern(),
            batch_size: default_batch_size(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.despesas.toml` configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSection,

    /// Physical column behind each filter dimension
    #[serde(default)]
    pub columns: ColumnMap,

    #[serde(default)]
    pub ingest: IngestSection,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.despesas.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> ConfigResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> ConfigResult<()> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| ConfigError::Io(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = path;
        }

        if let Some(table) = lookup(ENV_TABLE)
            && !table.trim().is_empty()
        {
            self.store.table = table;
        }

        if let Some(dir) = lookup(ENV_SOURCE_DIR) {
            self.ingest.source_dir = dir;
        }
    }

    /// Database path for a workspace
    pub fn db_path(&self, workspace_path: &Path) -> PathBuf {
        resolve(workspace_path, &self.store.path, DEFAULT_DB_FILENAME)
    }

    /// Source directory for a workspace
    pub fn source_dir(&self, workspace_path: &Path) -> PathBuf {
        resolve(workspace_path, &self.ingest.source_dir, ".")
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }
}

fn resolve(workspace_path: &Path, configured: &str, fallback: &str) -> PathBuf {
    if configured.is_empty() {
        workspace_path.join(fallback)
    } else if Path::new(configured).is_absolute() {
        PathBuf::from(configured)
    } else {
        workspace_path.join(configured)
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Despesas explorer configuration

[store]
# Path to the DuckDB database file (relative to workspace, or absolute)
path = "despesas.duckdb"
# Table holding the ingested records
table = "despesas"

[columns]
# Date column in YYYY-MM form, backs the year, quarter and month filters
date = "Ano e mês do lançamento"
action = "Nome Ação"
superior_organ = "Nome Órgão Superior"
budget_plan = "Plano Orçamentário"
economic_category = "Nome Categoria Econômica"
amendment_author = "Nome Autor Emenda"

[ingest]
source_dir = "data"
# Tried first; fallback_pattern is used when it matches nothing
pattern = "*.crc"
fallback_pattern = "*.parquet"
batch_size = 8192
"#
}

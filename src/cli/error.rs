//! CLI-specific error types

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::ingest::IngestError;
use crate::store::StoreError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("IO error: {0}")]
    IoError(String),
}

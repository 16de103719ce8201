//! Parquet ingestion
//!
//! Loads a set of Parquet files into the store, one record batch per
//! row-group:
//! - `discover`: resolve the input file list from a directory
//! - `reader`: row-group batch reader over one file
//! - `pipeline`: the transactional ingestion run and its progress reporting

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

pub mod discover;
pub mod pipeline;
pub mod reader;

pub use discover::discover_files;
pub use pipeline::{
    BatchProgress, Bootstrap, IngestPipeline, IngestProgress, LogProgress, NoopProgress,
    ensure_ingested,
};
pub use reader::BatchReader;

/// Error type for ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Empty input file list
    #[error("No input files found")]
    NoFilesFound,

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(String),

    /// A file or one of its row-groups could not be opened or decoded
    #[error("Failed to read {path}{}: {error}", row_group_suffix(.row_group))]
    ReadFailure {
        path: PathBuf,
        row_group: Option<usize>,
        error: String,
    },

    /// A batch does not fit the table created by the first batch of the run
    #[error("Schema mismatch in {path} (row group {row_group}): {detail}")]
    SchemaMismatch {
        path: PathBuf,
        row_group: usize,
        detail: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn row_group_suffix(row_group: &Option<usize>) -> String {
    row_group
        .map(|rg| format!(" (row group {})", rg))
        .unwrap_or_default()
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Number of files processed
    pub files_processed: usize,
    /// Number of row-groups written
    pub row_groups_processed: usize,
    /// Number of records ingested
    pub records_ingested: usize,
    /// Total bytes of the input files
    pub bytes_processed: u64,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_ingested as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_stats() {
        let mut stats = IngestStats::new();
        stats.files_processed = 10;
        stats.records_ingested = 1000;
        stats.duration = Duration::from_secs(10);

        assert_eq!(stats.throughput(), 100.0);
        assert_eq!(stats.duration_string(), "10s");
    }

    #[test]
    fn test_ingest_stats_duration_formatting() {
        let mut stats = IngestStats::new();

        stats.duration = Duration::from_secs(90);
        assert_eq!(stats.duration_string(), "1m 30s");

        stats.duration = Duration::from_secs(3661);
        assert_eq!(stats.duration_string(), "1h 1m 1s");
    }

    #[test]
    fn test_read_failure_message() {
        let err = IngestError::ReadFailure {
            path: PathBuf::from("a.parquet"),
            row_group: Some(3),
            error: "corrupt".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to read a.parquet (row group 3): corrupt");

        let err = IngestError::ReadFailure {
            path: PathBuf::from("a.parquet"),
            row_group: None,
            error: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to read a.parquet: missing");
    }
}

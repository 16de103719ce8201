//! Despesas explorer - Parquet ingestion and faceted filtering over expense records
//!
//! Provides:
//! - Ingestion of Parquet row-groups into an embedded DuckDB table
//! - Secondary index management for integer and date columns
//! - Filter state, parameterized predicates and facet option lists
//! - Paginated and filtered reads
//! - Configuration file support

pub mod config;
pub mod facet;
pub mod filter;
pub mod ingest;
pub mod store;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{AppConfig, ConfigError};
pub use facet::{FacetLists, resolve, resolve_all};
pub use filter::{
    BoundColumns, Category, ColumnMap, Dimension, FilterError, FilterState, Month, Predicate,
    Quarter, TemporalOptions, Year, build_predicate,
};
pub use ingest::{
    BatchReader, Bootstrap, IngestError, IngestPipeline, IngestProgress, IngestStats,
    discover_files, ensure_ingested,
};
pub use store::{
    DEFAULT_TABLE, FilteredRows, IndexReport, OutputFormat, QueryResult, Store, StoreError,
    StoreResult, TableSchema, build_indexes, format_query_result, read_filtered, read_page,
};

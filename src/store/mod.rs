//! Embedded store for ingested expense records
//!
//! This module wraps a single DuckDB database file holding one logical table
//! (`despesas` by default) plus the secondary indexes built over it:
//! - `duckdb`: the [`Store`] handle (connection, transactions, raw queries)
//! - `schema`: column type mapping and identifier validation
//! - `writer`: create/append of Arrow record batches
//! - `index`: secondary index management for integer and date columns
//! - `reader`: paginated and filtered reads

use serde::{Deserialize, Serialize};

pub mod duckdb;
pub mod index;
pub mod reader;
pub mod schema;
pub mod writer;

pub use self::duckdb::Store;
pub use index::{IndexReport, build_indexes, index_name};
pub use reader::{FilteredRows, read_filtered, read_page};
pub use schema::{ColumnInfo, ColumnType, TableSchema, quote_ident};
pub use writer::{StoreWriter, WriteMode};

/// Default name of the table holding the ingested records
pub const DEFAULT_TABLE: &str = "despesas";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or lock the database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Writing rows failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Transaction begin/commit failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A batch is not compatible with the established table schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A column type that has no mapping in the store
    #[error("Unsupported type for column '{column}': {data_type}")]
    UnsupportedType { column: String, data_type: String },

    /// Table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Identifier is not part of the known schema
    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Index creation failed; safe to retry
    #[error("Failed to create index {index}: {error}")]
    IndexCreationFailed { index: String, error: String },

    /// Filtered display requested with no dimension constrained
    #[error("Apply at least one filter before requesting filtered results")]
    EmptyFilter,

    /// Non-positive limit or negative offset
    #[error("Invalid pagination: limit must be >= 1 and offset >= 0 (got limit={limit}, offset={offset})")]
    InvalidPagination { limit: i64, offset: i64 },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order
    pub fn column_values(&self, column: &str) -> Vec<&serde_json::Value> {
        self.rows
            .iter()
            .map(|row| row.get(column).unwrap_or(&serde_json::Value::Null))
            .collect()
    }
}

/// Output format for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Format query results for display
pub fn format_query_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&result.rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_as_csv(result),
        OutputFormat::Table => format_as_table(result),
    }
}

fn cell_text(value: &serde_json::Value, null: &str) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => null.to_string(),
        other => other.to_string(),
    }
}

fn format_as_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    output.push_str(&result.columns.join(","));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .map(|col| {
                let text = cell_text(row.get(col).unwrap_or(&serde_json::Value::Null), "");
                if text.contains(',') || text.contains('"') || text.contains('\n') {
                    format!("\"{}\"", text.replace('"', "\"\""))
                } else {
                    text
                }
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn format_as_table(result: &QueryResult) -> String {
    if result.is_empty() {
        return "(0 rows)".to_string();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();

    for row in &result.rows {
        for (i, col) in result.columns.iter().enumerate() {
            let value = row.get(col).unwrap_or(&serde_json::Value::Null);
            widths[i] = widths[i].max(cell_text(value, "null").chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(&header.join(" | "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &result.rows {
        let values: Vec<String> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let value = row.get(col).unwrap_or(&serde_json::Value::Null);
                format!("{:width$}", cell_text(value, "null"), width = widths[i])
            })
            .collect();
        output.push_str(&values.join(" | "));
        output.push('\n');
    }

    output.push_str(&format!("({} rows)", result.row_count()));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("CSV").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
        assert_eq!(format_as_table(&result), "(0 rows)");
    }

    #[test]
    fn test_format_as_table() {
        let result = QueryResult::new(
            vec!["Nome Ação".to_string(), "Valor Pago (R$)".to_string()],
            vec![
                serde_json::json!({"Nome Ação": "Saúde", "Valor Pago (R$)": 10.5}),
                serde_json::json!({"Nome Ação": "Educação", "Valor Pago (R$)": null}),
            ],
        );

        let output = format_as_table(&result);
        assert!(output.contains("Nome Ação"));
        assert!(output.contains("Educação"));
        assert!(output.contains("null"));
        assert!(output.contains("(2 rows)"));
    }

    #[test]
    fn test_format_as_csv_quotes_commas() {
        let result = QueryResult::new(
            vec!["orgao".to_string(), "valor".to_string()],
            vec![
                serde_json::json!({"orgao": "Ministério da Saúde", "valor": 1}),
                serde_json::json!({"orgao": "Ciência, Tecnologia", "valor": 2}),
            ],
        );

        let output = format_as_csv(&result);
        assert!(output.starts_with("orgao,valor\n"));
        assert!(output.contains("Ministério da Saúde,1"));
        assert!(output.contains("\"Ciência, Tecnologia\",2"));
    }

    #[test]
    fn test_column_values() {
        let result = QueryResult::new(
            vec!["a".to_string()],
            vec![serde_json::json!({"a": 1}), serde_json::json!({"b": 2})],
        );
        let values = result.column_values("a");
        assert_eq!(values[0], &serde_json::json!(1));
        assert!(values[1].is_null());
    }
}

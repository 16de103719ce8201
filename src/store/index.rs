//! Secondary indexes on integer and date columns
//!
//! Index names are derived from the table and column names, so building the
//! index set is idempotent: existing indexes are detected through the catalog
//! and left alone.

use serde::{Deserialize, Serialize};

use super::schema::{TableSchema, quote_ident};
use super::{Store, StoreError, StoreResult};

/// Outcome of an index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    /// Indexes created by this call
    pub created: Vec<String>,
    /// Eligible indexes that already existed
    pub existing: Vec<String>,
}

impl IndexReport {
    /// Every index covering the table's integer and date columns
    pub fn all(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .created
            .iter()
            .chain(&self.existing)
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Deterministic index name for a column: `idx_<table>_<column>` with spaces as underscores
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column.replace(' ', "_"))
}

/// Create indexes on every integer- or date-typed column of `table`
pub fn build_indexes(store: &Store, table: &str) -> StoreResult<IndexReport> {
    store.with_connection(|conn| {
        let schema = TableSchema::load(conn, table)?
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let present = existing_indexes(conn, table)?;
        let mut report = IndexReport::default();

        for column in &schema.columns {
            if !(column.column_type.is_integer_like() || column.column_type.is_date_like()) {
                continue;
            }

            let name = index_name(table, &column.name);
            if present.iter().any(|p| p == &name) {
                tracing::debug!("Index {} already present", name);
                report.existing.push(name);
                continue;
            }

            let sql = format!(
                "CREATE INDEX {} ON {} ({})",
                quote_ident(&name),
                quote_ident(table),
                quote_ident(&column.name)
            );
            tracing::info!("Creating index: {}", sql);
            conn.execute(&sql, [])
                .map_err(|e| StoreError::IndexCreationFailed {
                    index: name.clone(),
                    error: e.to_string(),
                })?;
            report.created.push(name);
        }

        Ok(report)
    })
}

fn existing_indexes(conn: &duckdb::Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT index_name FROM duckdb_indexes() WHERE table_name = ? \
             AND schema_name = current_schema() AND database_name = current_database()",
        )
        .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

    stmt.query_map([table], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError::QueryFailed(format!("Index lookup failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))
}

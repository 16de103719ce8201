//! DuckDB store handle
//!
//! Provides the embedded database holding the ingested table. Supports both
//! file-based persistence and in-memory mode (used by tests).

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::schema::TableSchema;
use super::{QueryResult, StoreError, StoreResult};

/// DuckDB-backed store
///
/// All access goes through one connection; the mutex serializes callers.
pub struct Store {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl Store {
    /// Open (or create) a file-based store
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open DuckDB: {}", e))
        })?;

        tracing::debug!("Opened store at {}", path.display());

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory store
    pub fn in_memory() -> StoreResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory store
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Run `f` against the connection outside of an explicit transaction
    pub fn with_connection<T, E>(
        &self,
        f: impl FnOnce(&duckdb::Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a single transaction
    ///
    /// Commits when `f` returns `Ok`; any error rolls everything back.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&duckdb::Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::TransactionFailed(format!("Begin failed: {}", e)))?;

        // Dropping `tx` on the error path rolls it back.
        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| StoreError::TransactionFailed(format!("Commit failed: {}", e)))?;
        Ok(value)
    }

    /// Execute a statement that doesn't return rows
    pub fn execute(&self, sql: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| StoreError::QueryFailed(format!("Execute failed: {}", e)))
    }

    /// Execute multiple SQL statements
    pub fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| StoreError::QueryFailed(format!("Batch execute failed: {}", e)))
    }

    /// Check whether `table` exists
    pub fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        table_exists(&conn, table)
    }

    /// Schema of `table`, failing with `TableNotFound` when absent
    pub fn table_schema(&self, table: &str) -> StoreResult<TableSchema> {
        let conn = self.lock()?;
        TableSchema::load(&conn, table)?.ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Number of rows in `table`
    pub fn row_count(&self, table: &str) -> StoreResult<u64> {
        let schema = self.table_schema(table)?;
        let conn = self.lock()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            super::schema::quote_ident(&schema.table)
        );
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count as u64)
    }

    /// Execute a query with bound parameters and collect all rows as JSON
    pub fn query<P: duckdb::Params>(&self, sql: &str, params: P) -> StoreResult<QueryResult> {
        let conn = self.lock()?;
        run_query(&conn, sql, params)
    }

    /// Execute a query returning a single text column, NULLs included as `None`
    pub fn query_strings<P: duckdb::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> StoreResult<Vec<Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

        stmt.query_map(params, |row| row.get::<_, Option<String>>(0))
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))
    }
}

/// Check whether `table` exists on an open connection
pub(crate) fn table_exists(conn: &duckdb::Connection, table: &str) -> StoreResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ? \
             AND table_schema = current_schema() AND table_catalog = current_database()",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::QueryFailed(format!("Table lookup failed: {}", e)))?;
    Ok(count > 0)
}

pub(crate) fn run_query<P: duckdb::Params>(
    conn: &duckdb::Connection,
    sql: &str,
    params: P,
) -> StoreResult<QueryResult> {
    let start = std::time::Instant::now();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

    // Column names are only available once the statement has executed
    let mut result_rows = stmt
        .query(params)
        .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

    let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
    let columns: Vec<String> = (0..column_count)
        .map(|i| {
            result_rows
                .as_ref()
                .and_then(|r| r.column_name(i).ok())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("col{}", i))
        })
        .collect();

    let mut rows = Vec::new();
    while let Some(row) = result_rows
        .next()
        .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?
    {
        rows.push(row_to_json(row, &columns));
    }

    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Convert a DuckDB row to a JSON object keyed by column name
fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    for (i, col_name) in columns.iter().enumerate() {
        let value = match row.get_ref(i) {
            Ok(value_ref) => value_ref_to_json(value_ref),
            Err(_) => serde_json::Value::Null,
        };
        map.insert(col_name.clone(), value);
    }

    serde_json::Value::Object(map)
}

/// Convert a DuckDB ValueRef to a JSON value
fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::SmallInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::Int(i) => serde_json::Value::Number(i.into()),
        ValueRef::BigInt(i) => serde_json::Value::Number(i.into()),
        // i128 may not fit in a JSON number
        ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
        ValueRef::UTinyInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::USmallInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::UInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::UBigInt(i) => serde_json::Value::Number(i.into()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Blob(bytes) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        ValueRef::Date32(days) => chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
            .map(|dt| serde_json::Value::String(dt.date_naive().format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Timestamp(unit, raw) => {
            let micros = unit.to_micros(raw);
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| {
                    serde_json::Value::String(
                        dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                    )
                })
                .unwrap_or(serde_json::Value::Null)
        }
        ValueRef::Time64(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Interval { .. } => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::List(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Enum(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Struct(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Map(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Union(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Array(_, _) => serde_json::Value::String(format!("{:?}", value)),
        ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}

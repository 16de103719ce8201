//! Writing Arrow record batches into the store
//!
//! The first batch of a run defines the table (`WriteMode::Create`, which drops
//! any existing table of the same name); later batches are appended
//! (`WriteMode::Append`) after being checked against the established schema.

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute::CastOptions;
use arrow::datatypes::{
    Date32Type, Decimal128Type, Float64Type, Int64Type, TimestampMicrosecondType, UInt64Type,
};
use duckdb::types::{TimeUnit, Value};

use super::schema::{ColumnType, TableSchema, quote_ident};
use super::{StoreError, StoreResult};

/// How a batch is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop and recreate the table from the batch schema, then insert
    Create,
    /// Insert into the existing table
    Append,
}

/// Writes batches into one table on a borrowed connection
///
/// The connection is usually a transaction opened by the ingestion pipeline.
pub struct StoreWriter<'conn> {
    conn: &'conn duckdb::Connection,
    table: String,
    schema: Option<TableSchema>,
}

impl<'conn> StoreWriter<'conn> {
    pub fn new(conn: &'conn duckdb::Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
            schema: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Schema established by this writer (or loaded on first append)
    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Whether this writer has already created its table
    pub fn is_created(&self) -> bool {
        self.schema.is_some()
    }

    /// Write `batch`, returning the number of rows appended
    pub fn write(&mut self, batch: &RecordBatch, mode: WriteMode) -> StoreResult<usize> {
        match mode {
            WriteMode::Create => self.create(batch)?,
            WriteMode::Append => {
                if self.schema.is_none() {
                    self.schema = Some(
                        TableSchema::load(self.conn, &self.table)?
                            .ok_or_else(|| StoreError::TableNotFound(self.table.clone()))?,
                    );
                }
            }
        }

        let schema = self
            .schema
            .as_ref()
            .ok_or_else(|| StoreError::TableNotFound(self.table.clone()))?;
        let columns = align_columns(schema, batch)?;
        append_rows(self.conn, schema, &columns, batch.num_rows())?;

        tracing::debug!(
            "Wrote {} rows into {} ({:?})",
            batch.num_rows(),
            self.table,
            mode
        );
        Ok(batch.num_rows())
    }

    fn create(&mut self, batch: &RecordBatch) -> StoreResult<()> {
        let schema = TableSchema::from_arrow(&self.table, batch.schema().as_ref())?;
        if schema.columns.is_empty() {
            return Err(StoreError::SchemaMismatch(format!(
                "cannot create table {} from a batch without columns",
                self.table
            )));
        }

        let sql = format!(
            "DROP TABLE IF EXISTS {}; {};",
            quote_ident(&self.table),
            schema.create_table_sql()
        );
        self.conn
            .execute_batch(&sql)
            .map_err(|e| StoreError::WriteFailed(format!("Failed to create {}: {}", self.table, e)))?;

        self.schema = Some(schema);
        Ok(())
    }
}

/// Match batch columns to table columns, casting each to the stored type
///
/// Returns one entry per table column; `None` where the batch lacks the column.
/// A value the stored type cannot hold fails the batch instead of becoming NULL.
fn align_columns(schema: &TableSchema, batch: &RecordBatch) -> StoreResult<Vec<Option<ArrayRef>>> {
    let batch_schema = batch.schema();

    for field in batch_schema.fields() {
        let stored = schema.column(field.name()).ok_or_else(|| {
            StoreError::SchemaMismatch(format!(
                "column '{}' is not part of table {}",
                field.name(),
                schema.table
            ))
        })?;
        let incoming = ColumnType::from_arrow(field.name(), field.data_type())?;
        if !incoming.coercible_to(&stored.column_type) {
            return Err(StoreError::SchemaMismatch(format!(
                "column '{}' has type {} but table {} stores {}",
                field.name(),
                incoming,
                schema.table,
                stored.column_type
            )));
        }
    }

    schema
        .columns
        .iter()
        .map(|column| {
            let Some(array) = batch.column_by_name(&column.name) else {
                return Ok(None);
            };
            let target = column.column_type.arrow_type().ok_or_else(|| {
                StoreError::SchemaMismatch(format!(
                    "column '{}' has declared type {} which cannot receive batch data",
                    column.name, column.column_type
                ))
            })?;
            let options = CastOptions {
                safe: false,
                ..Default::default()
            };
            arrow::compute::cast_with_options(array, &target, &options)
                .map(Some)
                .map_err(|e| {
                    StoreError::SchemaMismatch(format!(
                        "values of column '{}' do not fit {}: {}",
                        column.name, column.column_type, e
                    ))
                })
        })
        .collect()
}

fn append_rows(
    conn: &duckdb::Connection,
    schema: &TableSchema,
    columns: &[Option<ArrayRef>],
    num_rows: usize,
) -> StoreResult<()> {
    if num_rows == 0 {
        return Ok(());
    }

    let mut appender = conn
        .appender(&schema.table)
        .map_err(|e| StoreError::WriteFailed(format!("Failed to open appender: {}", e)))?;

    for row in 0..num_rows {
        let values = schema
            .columns
            .iter()
            .zip(columns)
            .map(|(column, array)| match array {
                Some(array) => cell(array, &column.column_type, row),
                None => Value::Null,
            });
        appender
            .append_row(duckdb::appender_params_from_iter(values))
            .map_err(|e| StoreError::WriteFailed(format!("Failed to append row {}: {}", row, e)))?;
    }

    appender
        .flush()
        .map_err(|e| StoreError::WriteFailed(format!("Failed to flush appender: {}", e)))
}

/// Value at `row` of an array already cast to the arrow type of `column_type`
fn cell(array: &ArrayRef, column_type: &ColumnType, row: usize) -> Value {
    if array.is_null(row) {
        return Value::Null;
    }
    match column_type {
        ColumnType::Integer => Value::BigInt(array.as_primitive::<Int64Type>().value(row)),
        ColumnType::UBigInt => Value::UBigInt(array.as_primitive::<UInt64Type>().value(row)),
        ColumnType::Double => Value::Double(array.as_primitive::<Float64Type>().value(row)),
        // DuckDB parses the exact decimal text into the DECIMAL column
        ColumnType::Decimal { .. } => {
            Value::Text(array.as_primitive::<Decimal128Type>().value_as_string(row))
        }
        ColumnType::Boolean => Value::Boolean(array.as_boolean().value(row)),
        ColumnType::Date => Value::Date32(array.as_primitive::<Date32Type>().value(row)),
        ColumnType::Timestamp => Value::Timestamp(
            TimeUnit::Microsecond,
            array.as_primitive::<TimestampMicrosecondType>().value(row),
        ),
        ColumnType::Text => Value::Text(array.as_string::<i32>().value(row).to_string()),
        ColumnType::Other(_) => Value::Null,
    }
}

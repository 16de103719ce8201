//! Table schema definitions
//!
//! Maps Arrow data types onto the small set of logical column types the store
//! understands, and reads declared column types back out of the DuckDB catalog.
//! Identifiers are only ever interpolated into SQL after being checked against
//! a [`TableSchema`] loaded from the catalog, and are always double-quoted.

use arrow::datatypes::{DataType, TimeUnit};
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};

/// Widest DECIMAL precision DuckDB can store
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Logical column type of a stored column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    /// Unsigned 64-bit integer, which does not fit a BIGINT
    UBigInt,
    Double,
    /// Fixed-point number, stored exactly
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Date,
    Timestamp,
    Text,
    /// Declared type with no ingestion mapping (tables created outside this crate)
    Other(String),
}

impl ColumnType {
    /// Map an Arrow data type to a column type
    pub fn from_arrow(column: &str, data_type: &DataType) -> StoreResult<Self> {
        let ty = match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => ColumnType::Integer,
            DataType::UInt64 => ColumnType::UBigInt,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Double,
            DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale)
                if *precision <= MAX_DECIMAL_PRECISION && *scale >= 0 =>
            {
                ColumnType::Decimal {
                    precision: *precision,
                    scale: *scale as u8,
                }
            }
            DataType::Boolean => ColumnType::Boolean,
            DataType::Date32 | DataType::Date64 => ColumnType::Date,
            DataType::Timestamp(_, _) => ColumnType::Timestamp,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnType::Text,
            DataType::Dictionary(_, value)
                if matches!(
                    value.as_ref(),
                    DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
                ) =>
            {
                ColumnType::Text
            }
            other => {
                return Err(StoreError::UnsupportedType {
                    column: column.to_string(),
                    data_type: other.to_string(),
                });
            }
        };
        Ok(ty)
    }

    /// Map a type name declared in the DuckDB catalog
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        match upper.as_str() {
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT"
            | "USMALLINT" | "UINTEGER" | "UHUGEINT" | "INT" | "INT2" | "INT4" | "INT8" => {
                ColumnType::Integer
            }
            "UBIGINT" => ColumnType::UBigInt,
            "DOUBLE" | "FLOAT" | "REAL" | "FLOAT4" | "FLOAT8" => ColumnType::Double,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            "DATE" => ColumnType::Date,
            "VARCHAR" | "TEXT" | "STRING" => ColumnType::Text,
            _ if upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC") => {
                parse_decimal(&upper).unwrap_or_else(|| ColumnType::Other(declared.to_string()))
            }
            _ if upper.starts_with("TIMESTAMP") => ColumnType::Timestamp,
            _ if upper.starts_with("VARCHAR") => ColumnType::Text,
            _ => ColumnType::Other(declared.to_string()),
        }
    }

    /// DuckDB type used when creating a column of this type
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "BIGINT".to_string(),
            ColumnType::UBigInt => "UBIGINT".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
            ColumnType::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Text => "VARCHAR".to_string(),
            ColumnType::Other(declared) => declared.clone(),
        }
    }

    /// Arrow type that batch columns are cast to before appending
    pub fn arrow_type(&self) -> Option<DataType> {
        match self {
            ColumnType::Integer => Some(DataType::Int64),
            ColumnType::UBigInt => Some(DataType::UInt64),
            ColumnType::Double => Some(DataType::Float64),
            ColumnType::Decimal { precision, scale } => {
                Some(DataType::Decimal128(*precision, *scale as i8))
            }
            ColumnType::Boolean => Some(DataType::Boolean),
            ColumnType::Date => Some(DataType::Date32),
            ColumnType::Timestamp => Some(DataType::Timestamp(TimeUnit::Microsecond, None)),
            ColumnType::Text => Some(DataType::Utf8),
            ColumnType::Other(_) => None,
        }
    }

    /// Whether a batch column of type `self` may be appended into a column of type `target`
    ///
    /// Decimals may only widen their precision at the same scale.
    pub fn coercible_to(&self, target: &ColumnType) -> bool {
        match (self, target) {
            _ if self == target => true,
            (ColumnType::Integer | ColumnType::UBigInt, ColumnType::Double) => true,
            (
                ColumnType::Decimal { precision, scale },
                ColumnType::Decimal {
                    precision: target_precision,
                    scale: target_scale,
                },
            ) => scale == target_scale && precision <= target_precision,
            _ => false,
        }
    }

    /// Integer-typed columns get a secondary index
    pub fn is_integer_like(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::UBigInt)
    }

    /// Date-typed columns get a secondary index
    pub fn is_date_like(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Timestamp)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

/// A column of a stored table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered column list of a stored table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Build a schema from an Arrow schema
    pub fn from_arrow(table: &str, schema: &arrow::datatypes::Schema) -> StoreResult<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|field| {
                ColumnType::from_arrow(field.name(), field.data_type())
                    .map(|ty| ColumnInfo::new(field.name().clone(), ty))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Self::new(table, columns))
    }

    /// Read the schema of `table` from the catalog, `None` if the table does not exist
    pub fn load(conn: &duckdb::Connection, table: &str) -> StoreResult<Option<Self>> {
        let mut stmt = conn
            .prepare(
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_name = ? AND table_schema = current_schema() \
                 AND table_catalog = current_database() ORDER BY ordinal_position",
            )
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(ColumnInfo::new(name, ColumnType::from_declared(&declared)))
            })
            .map_err(|e| StoreError::QueryFailed(format!("Schema lookup failed: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?;

        if columns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self::new(table, columns)))
        }
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Quoted identifier of a column that must exist in this schema
    pub fn require(&self, name: &str) -> StoreResult<String> {
        self.column(name)
            .map(|c| quote_ident(&c.name))
            .ok_or_else(|| StoreError::UnknownColumn {
                table: self.table.clone(),
                column: name.to_string(),
            })
    }

    /// Column definitions for `CREATE TABLE`
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_ident(&self.table),
            definitions.join(", ")
        )
    }
}

/// `DECIMAL(p,s)` / `NUMERIC(p,s)`; bare `DECIMAL` is DuckDB's DECIMAL(18,3)
fn parse_decimal(upper: &str) -> Option<ColumnType> {
    let args = upper
        .strip_prefix("DECIMAL")
        .or_else(|| upper.strip_prefix("NUMERIC"))?
        .trim();
    if args.is_empty() {
        return Some(ColumnType::Decimal {
            precision: 18,
            scale: 3,
        });
    }
    let (precision, scale) = args
        .strip_prefix('(')?
        .strip_suffix(')')?
        .split_once(',')?;
    Some(ColumnType::Decimal {
        precision: precision.trim().parse().ok()?,
        scale: scale.trim().parse().ok()?,
    })
}

/// Quote an identifier for interpolation into SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

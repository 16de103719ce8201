//! Paginated and filtered reads

use serde::{Deserialize, Serialize};

use super::schema::quote_ident;
use super::{QueryResult, Store, StoreError, StoreResult};
use crate::filter::{BoundColumns, FilterState, build_predicate};

/// Result of the final filtered read, with the statement that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredRows {
    /// Statement text with `?` placeholders
    pub sql: String,
    /// Values bound to the placeholders, in order
    pub params: Vec<String>,
    pub result: QueryResult,
}

/// A window of `limit` rows starting at `offset`, in insertion order
pub fn read_page(store: &Store, table: &str, limit: i64, offset: i64) -> StoreResult<QueryResult> {
    if limit < 1 || offset < 0 {
        return Err(StoreError::InvalidPagination { limit, offset });
    }

    let schema = store.table_schema(table)?;
    let sql = format!(
        "SELECT * FROM {} ORDER BY rowid LIMIT ? OFFSET ?",
        quote_ident(&schema.table)
    );
    store.query(&sql, duckdb::params![limit, offset])
}

/// Every row matching `state`; an unconstrained state is rejected
pub fn read_filtered(
    store: &Store,
    columns: &BoundColumns,
    state: &FilterState,
) -> StoreResult<FilteredRows> {
    if state.is_unconstrained() {
        return Err(StoreError::EmptyFilter);
    }

    let predicate = build_predicate(state, columns, None);
    let sql = format!(
        "SELECT * FROM {}{} ORDER BY rowid",
        columns.table(),
        predicate.where_sql()
    );
    tracing::debug!("Filtered read: {} {:?}", sql, predicate.params());

    let result = store.query(&sql, duckdb::params_from_iter(predicate.params()))?;
    Ok(FilteredRows {
        sql,
        params: predicate.params,
        result,
    })
}

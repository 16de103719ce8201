//! Facet option lists
//!
//! The options of a dimension are the distinct values still reachable under
//! the filter state with that dimension's own constraint removed. Nothing is
//! cached; every call queries the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::{
    BoundColumns, Category, Dimension, FilterState, TemporalOptions, build_predicate,
};
use crate::store::{Store, StoreResult};

/// Option lists of every dimension for one filter state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetLists {
    pub years: Vec<String>,
    pub quarters: Vec<String>,
    pub months: Vec<String>,
    pub categories: BTreeMap<Category, Vec<String>>,
}

impl FacetLists {
    /// Options of one dimension
    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Year => &self.years,
            Dimension::Quarter => &self.quarters,
            Dimension::Month => &self.months,
            Dimension::Category(category) => self
                .categories
                .get(&category)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

/// Sorted distinct options of `dimension` under `state`, own selection ignored
pub fn resolve(
    store: &Store,
    columns: &BoundColumns,
    dimension: Dimension,
    state: &FilterState,
) -> StoreResult<Vec<String>> {
    let predicate = build_predicate(state, columns, Some(dimension));
    let expr = match dimension {
        Dimension::Category(category) => columns.category_expr(category),
        Dimension::Year | Dimension::Quarter | Dimension::Month => columns.period_expr(),
    };

    let mut clauses = predicate.clauses.clone();
    clauses.push(format!("{} IS NOT NULL", expr));
    let sql = format!(
        "SELECT DISTINCT {} AS value FROM {} WHERE {}",
        expr,
        columns.table(),
        clauses.join(" AND ")
    );
    tracing::debug!("Resolving facet {}: {}", dimension, sql);

    let values: Vec<String> = store
        .query_strings(&sql, duckdb::params_from_iter(predicate.params()))?
        .into_iter()
        .flatten()
        .collect();

    let mut options = match dimension {
        Dimension::Category(_) => values,
        Dimension::Year => TemporalOptions::from_periods(&values)
            .years
            .into_iter()
            .map(String::from)
            .collect(),
        Dimension::Quarter => TemporalOptions::from_periods(&values)
            .quarters
            .into_iter()
            .map(|q| q.label().to_string())
            .collect(),
        Dimension::Month => TemporalOptions::from_periods(&values)
            .months
            .into_iter()
            .map(|m| m.code().to_string())
            .collect(),
    };
    options.sort();
    options.dedup();
    Ok(options)
}

/// Option lists of every dimension, one query each
pub fn resolve_all(
    store: &Store,
    columns: &BoundColumns,
    state: &FilterState,
) -> StoreResult<FacetLists> {
    let mut lists = FacetLists {
        years: resolve(store, columns, Dimension::Year, state)?,
        quarters: resolve(store, columns, Dimension::Quarter, state)?,
        months: resolve(store, columns, Dimension::Month, state)?,
        categories: BTreeMap::new(),
    };
    for category in Category::all() {
        lists.categories.insert(
            category,
            resolve(store, columns, Dimension::Category(category), state)?,
        );
    }
    Ok(lists)
}

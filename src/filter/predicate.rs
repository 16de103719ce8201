//! Translate a [`FilterState`] into a parameterized SQL predicate
//!
//! Only identifiers from [`BoundColumns`] are interpolated; every selected
//! value is a positional `?` parameter.

use serde::{Deserialize, Serialize};

use super::{BoundColumns, Dimension, FilterState};

/// Conjunction of active filter clauses with their bound values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub clauses: Vec<String>,
    pub params: Vec<String>,
}

impl Predicate {
    /// True when no clause is active (matches every row)
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Clauses joined with `AND`, without a leading keyword
    pub fn clause(&self) -> String {
        self.clauses.join(" AND ")
    }

    /// ` WHERE ...` suffix, or an empty string when unconstrained
    pub fn where_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause())
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    fn push(&mut self, clause: String, params: impl IntoIterator<Item = String>) {
        self.clauses.push(clause);
        self.params.extend(params);
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Build the predicate for `state`, leaving `exclude` unconstrained
pub fn build_predicate(
    state: &FilterState,
    columns: &BoundColumns,
    exclude: Option<Dimension>,
) -> Predicate {
    let mut predicate = Predicate::default();
    let active = |dimension: Dimension| exclude != Some(dimension);

    if let Some(year) = &state.year
        && active(Dimension::Year)
    {
        predicate.push(
            format!("{} = ?", columns.year_expr()),
            [year.as_str().to_string()],
        );
    }

    if let Some(quarter) = state.quarter
        && active(Dimension::Quarter)
    {
        let months = quarter.months();
        predicate.push(
            format!(
                "{} IN ({})",
                columns.month_expr(),
                placeholders(months.len())
            ),
            months.iter().map(|m| m.code().to_string()),
        );
    }

    if let Some(month) = state.month
        && active(Dimension::Month)
    {
        predicate.push(
            format!("{} = ?", columns.month_expr()),
            [month.code().to_string()],
        );
    }

    for (category, values) in state.selections() {
        if values.is_empty() || !active(Dimension::Category(category)) {
            continue;
        }
        predicate.push(
            format!(
                "{} IN ({})",
                columns.category_expr(category),
                placeholders(values.len())
            ),
            values.iter().cloned(),
        );
    }

    predicate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Category, ColumnMap, Month, Quarter};
    use crate::store::{ColumnInfo, ColumnType, TableSchema};

    fn columns() -> BoundColumns {
        let map = ColumnMap::default();
        let mut infos = vec![ColumnInfo::new(map.date.clone(), ColumnType::Text)];
        for category in Category::all() {
            infos.push(ColumnInfo::new(map.category(category), ColumnType::Text));
        }
        map.bind(&TableSchema::new("despesas", infos)).unwrap()
    }

    #[test]
    fn test_unconstrained_state_is_empty() {
        let predicate = build_predicate(&FilterState::new(), &columns(), None);
        assert!(predicate.is_empty());
        assert_eq!(predicate.where_sql(), "");
        assert!(predicate.params().is_empty());
    }

    #[test]
    fn test_conjunction_of_year_and_category() {
        let state = FilterState::new()
            .with_year("2022".parse().unwrap())
            .with_selection(Category::Action, ["B", "A"]);
        let predicate = build_predicate(&state, &columns(), None);

        assert_eq!(predicate.clauses.len(), 2);
        assert_eq!(
            predicate.where_sql(),
            " WHERE substr(CAST(\"Ano e mês do lançamento\" AS VARCHAR), 1, 4) = ? \
             AND CAST(\"Nome Ação\" AS VARCHAR) IN (?, ?)"
        );
        assert_eq!(predicate.params(), ["2022", "A", "B"]);
    }

    #[test]
    fn test_quarter_binds_its_three_months() {
        let state = FilterState::new().with_quarter(Quarter::Q2);
        let predicate = build_predicate(&state, &columns(), None);

        assert_eq!(
            predicate.clause(),
            "substr(CAST(\"Ano e mês do lançamento\" AS VARCHAR), 6, 2) IN (?, ?, ?)"
        );
        assert_eq!(predicate.params(), ["04", "05", "06"]);
    }

    #[test]
    fn test_exclude_drops_only_that_dimension() {
        let state = FilterState::new()
            .with_month(Month::March)
            .with_selection(Category::SuperiorOrgan, ["Ministério da Saúde"]);

        let without_month = build_predicate(&state, &columns(), Some(Dimension::Month));
        assert_eq!(without_month.params(), ["Ministério da Saúde"]);

        let without_organ = build_predicate(
            &state,
            &columns(),
            Some(Dimension::Category(Category::SuperiorOrgan)),
        );
        assert_eq!(without_organ.params(), ["03"]);
    }

    #[test]
    fn test_values_are_never_interpolated() {
        let state =
            FilterState::new().with_selection(Category::BudgetPlan, ["x'); DROP TABLE despesas;--"]);
        let predicate = build_predicate(&state, &columns(), None);
        assert!(!predicate.clause().contains("DROP"));
        assert_eq!(predicate.params().len(), 1);
    }
}

//! Filter state and dimensions
//!
//! A [`FilterState`] holds the current selection of every filterable
//! [`Dimension`]. Dimensions are a closed set; the physical column behind each
//! one is configured once in a [`ColumnMap`] and checked against the stored
//! table schema when bound ([`BoundColumns`]), so no raw column name travels
//! past that boundary.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod predicate;
pub mod temporal;

pub use predicate::{Predicate, build_predicate};
pub use temporal::{Month, Quarter, TemporalOptions, Year, parse_temporal};

use crate::store::{StoreResult, TableSchema, quote_ident};

/// Error type for filter parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Unknown quarter: {0}. Use Q1, Q2, Q3 or Q4.")]
    UnknownQuarter(String),

    #[error("Invalid year: {0}. Expected four digits.")]
    InvalidYear(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),
}

/// Categorical dimensions, matched by set membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Action,
    SuperiorOrgan,
    BudgetPlan,
    EconomicCategory,
    AmendmentAuthor,
}

impl Category {
    pub fn all() -> [Category; 5] {
        [
            Category::Action,
            Category::SuperiorOrgan,
            Category::BudgetPlan,
            Category::EconomicCategory,
            Category::AmendmentAuthor,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Action => "action",
            Category::SuperiorOrgan => "superior-organ",
            Category::BudgetPlan => "budget-plan",
            Category::EconomicCategory => "economic-category",
            Category::AmendmentAuthor => "amendment-author",
        }
    }
}

/// Every filterable dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    Year,
    Quarter,
    Month,
    Category(Category),
}

impl Dimension {
    /// All dimensions, temporal first
    pub fn all() -> Vec<Dimension> {
        let mut dims = vec![Dimension::Year, Dimension::Quarter, Dimension::Month];
        dims.extend(Category::all().map(Dimension::Category));
        dims
    }

    pub fn is_temporal(self) -> bool {
        !matches!(self, Dimension::Category(_))
    }

    pub fn key(self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::Quarter => "quarter",
            Dimension::Month => "month",
            Dimension::Category(category) => category.key(),
        }
    }
}

impl FromStr for Dimension {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Dimension::all()
            .into_iter()
            .find(|d| d.key() == key)
            .ok_or_else(|| FilterError::UnknownDimension(s.to_string()))
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Physical column names behind each dimension (`[columns]` config section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// `YYYY-MM` date column backing year, quarter and month
    #[serde(default = "default_date_column")]
    pub date: String,
    #[serde(default = "default_action_column")]
    pub action: String,
    #[serde(default = "default_superior_organ_column")]
    pub superior_organ: String,
    #[serde(default = "default_budget_plan_column")]
    pub budget_plan: String,
    #[serde(default = "default_economic_category_column")]
    pub economic_category: String,
    #[serde(default = "default_amendment_author_column")]
    pub amendment_author: String,
}

fn default_date_column() -> String {
    "Ano e mês do lançamento".to_string()
}

fn default_action_column() -> String {
    "Nome Ação".to_string()
}

fn default_superior_organ_column() -> String {
    "Nome Órgão Superior".to_string()
}

fn default_budget_plan_column() -> String {
    "Plano Orçamentário".to_string()
}

fn default_economic_category_column() -> String {
    "Nome Categoria Econômica".to_string()
}

fn default_amendment_author_column() -> String {
    "Nome Autor Emenda".to_string()
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: default_date_column(),
            action: default_action_column(),
            superior_organ: default_superior_organ_column(),
            budget_plan: default_budget_plan_column(),
            economic_category: default_economic_category_column(),
            amendment_author: default_amendment_author_column(),
        }
    }
}

impl ColumnMap {
    /// Column backing a categorical dimension
    pub fn category(&self, category: Category) -> &str {
        match category {
            Category::Action => &self.action,
            Category::SuperiorOrgan => &self.superior_organ,
            Category::BudgetPlan => &self.budget_plan,
            Category::EconomicCategory => &self.economic_category,
            Category::AmendmentAuthor => &self.amendment_author,
        }
    }

    /// Column backing any dimension
    pub fn column(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Year | Dimension::Quarter | Dimension::Month => &self.date,
            Dimension::Category(category) => self.category(category),
        }
    }

    /// Validate every mapped column against the stored schema
    pub fn bind(&self, schema: &TableSchema) -> StoreResult<BoundColumns> {
        let mut categories = BTreeMap::new();
        for category in Category::all() {
            categories.insert(category, schema.require(self.category(category))?);
        }
        Ok(BoundColumns {
            table: quote_ident(&schema.table),
            date: schema.require(&self.date)?,
            categories,
        })
    }
}

/// Quoted identifiers of a table and its dimension columns, validated against its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumns {
    table: String,
    date: String,
    categories: BTreeMap<Category, String>,
}

impl BoundColumns {
    /// Quoted table identifier
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `YYYY` component of the date column
    pub fn year_expr(&self) -> String {
        format!("substr(CAST({} AS VARCHAR), 1, 4)", self.date)
    }

    /// `MM` component of the date column
    pub fn month_expr(&self) -> String {
        format!("substr(CAST({} AS VARCHAR), 6, 2)", self.date)
    }

    /// `YYYY-MM` prefix of the date column
    pub fn period_expr(&self) -> String {
        format!("substr(CAST({} AS VARCHAR), 1, 7)", self.date)
    }

    /// Text value of a categorical column
    pub fn category_expr(&self, category: Category) -> String {
        // bind() fills every category, so the lookup cannot miss
        let column = self
            .categories
            .get(&category)
            .map(String::as_str)
            .unwrap_or("NULL");
        format!("CAST({} AS VARCHAR)", column)
    }
}

/// Current selection of every dimension
///
/// `None` / empty sets mean unconstrained. All set dimensions are conjoined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<Quarter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    categories: BTreeMap<Category, BTreeSet<String>>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, year: Year) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_quarter(mut self, quarter: Quarter) -> Self {
        self.quarter = Some(quarter);
        self
    }

    pub fn with_month(mut self, month: Month) -> Self {
        self.month = Some(month);
        self
    }

    /// Replace the selection of a categorical dimension
    pub fn with_selection<I, S>(mut self, category: Category, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(category, values);
        self
    }

    /// Replace the selection of a categorical dimension; an empty selection clears it
    pub fn select<I, S>(&mut self, category: Category, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.categories.remove(&category);
        } else {
            self.categories.insert(category, values);
        }
    }

    /// Selected values of a categorical dimension
    pub fn selection(&self, category: Category) -> Option<&BTreeSet<String>> {
        self.categories.get(&category)
    }

    /// Categorical selections in dimension order
    pub fn selections(&self) -> impl Iterator<Item = (Category, &BTreeSet<String>)> {
        self.categories.iter().map(|(c, v)| (*c, v))
    }

    /// Remove the constraint on one dimension
    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Year => self.year = None,
            Dimension::Quarter => self.quarter = None,
            Dimension::Month => self.month = None,
            Dimension::Category(category) => {
                self.categories.remove(&category);
            }
        }
    }

    /// Copy of this state with one dimension unconstrained
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut state = self.clone();
        state.clear(dimension);
        state
    }

    pub fn is_constrained(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Year => self.year.is_some(),
            Dimension::Quarter => self.quarter.is_some(),
            Dimension::Month => self.month.is_some(),
            Dimension::Category(category) => self.categories.contains_key(&category),
        }
    }

    /// True when no dimension is constrained
    pub fn is_unconstrained(&self) -> bool {
        Dimension::all().into_iter().all(|d| !self.is_constrained(d))
    }
}

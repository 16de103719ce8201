//! CLI command implementations

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::config::AppConfig;
use crate::filter::{
    BoundColumns, Category, FilterState, Month, Quarter, Year, parse_temporal,
};
use crate::store::{OutputFormat, Store};

pub mod facets;
pub mod index;
pub mod init;
pub mod ingest;
pub mod page;
pub mod query;
pub mod schema;

/// Configuration and store of one workspace directory
pub struct Workspace {
    pub path: PathBuf,
    pub config: AppConfig,
    pub store: Store,
}

impl Workspace {
    /// Load `.despesas.toml` (or defaults) and open the configured database
    pub fn open(path: &Path) -> Result<Self, CliError> {
        if !path.is_dir() {
            return Err(CliError::DirectoryNotFound(path.to_path_buf()));
        }
        let config = AppConfig::load(path)?;
        let db_path = config.db_path(path);
        tracing::debug!("Using database {}", db_path.display());
        let store = Store::open(&db_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
            store,
        })
    }

    pub fn table(&self) -> &str {
        &self.config.store.table
    }

    /// Dimension columns checked against the stored table
    pub fn bound_columns(&self) -> Result<BoundColumns, CliError> {
        let schema = self.store.table_schema(self.table())?;
        Ok(self.config.columns.bind(&schema)?)
    }
}

/// Parse an `--format` value
pub fn parse_format(format: &str) -> Result<OutputFormat, CliError> {
    format
        .parse::<OutputFormat>()
        .map_err(CliError::InvalidArgument)
}

/// Filter selections given on the command line
///
/// Temporal flags accept the "all" sentinels (`Todas`, `Todos`, `all`).
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FilterArgs {
    /// Year (YYYY)
    #[arg(long)]
    pub year: Option<String>,
    /// Quarter (Q1..Q4)
    #[arg(long)]
    pub quarter: Option<String>,
    /// Month name (Janeiro..Dezembro) or number (01..12)
    #[arg(long)]
    pub month: Option<String>,
    /// Action name (repeatable)
    #[arg(long)]
    pub action: Vec<String>,
    /// Superior organ name (repeatable)
    #[arg(long)]
    pub organ: Vec<String>,
    /// Budget plan (repeatable)
    #[arg(long)]
    pub plan: Vec<String>,
    /// Economic category (repeatable)
    #[arg(long)]
    pub category: Vec<String>,
    /// Amendment author (repeatable)
    #[arg(long)]
    pub author: Vec<String>,
}

impl FilterArgs {
    pub fn to_state(&self) -> Result<FilterState, CliError> {
        let mut state = FilterState::new();
        state.year = parse_optional::<Year>(&self.year)?;
        state.quarter = parse_optional::<Quarter>(&self.quarter)?;
        state.month = parse_optional::<Month>(&self.month)?;

        state.select(Category::Action, self.action.iter().cloned());
        state.select(Category::SuperiorOrgan, self.organ.iter().cloned());
        state.select(Category::BudgetPlan, self.plan.iter().cloned());
        state.select(Category::EconomicCategory, self.category.iter().cloned());
        state.select(Category::AmendmentAuthor, self.author.iter().cloned());
        Ok(state)
    }
}

fn parse_optional<T>(raw: &Option<String>) -> Result<Option<T>, CliError>
where
    T: std::str::FromStr<Err = crate::filter::FilterError>,
{
    match raw {
        Some(raw) => Ok(parse_temporal(raw)?),
        None => Ok(None),
    }
}

//! Facets command: option lists under a filter state

use std::path::PathBuf;

use super::{FilterArgs, Workspace, parse_format};
use crate::cli::error::CliError;
use crate::facet::{resolve, resolve_all};
use crate::filter::Dimension;
use crate::store::OutputFormat;

/// Facets command arguments
#[derive(Debug, Clone)]
pub struct FacetsArgs {
    pub workspace: PathBuf,
    /// Only this dimension (e.g. `year`, `superior-organ`)
    pub dimension: Option<String>,
    pub filters: FilterArgs,
    pub format: String,
}

/// Print the reachable options of every dimension (or one)
pub fn handle_facets(args: &FacetsArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let state = args.filters.to_state()?;
    let workspace = Workspace::open(&args.workspace)?;
    let columns = workspace.bound_columns()?;

    if let Some(raw) = &args.dimension {
        let dimension: Dimension = raw.parse()?;
        let options = resolve(&workspace.store, &columns, dimension, &state)?;
        if output_format == OutputFormat::Json {
            print_json(&options)?;
        } else {
            for option in options {
                println!("{}", option);
            }
        }
        return Ok(());
    }

    let lists = resolve_all(&workspace.store, &columns, &state)?;
    if output_format == OutputFormat::Json {
        return print_json(&lists);
    }
    for dimension in Dimension::all() {
        println!("{}: {}", dimension, lists.get(dimension).join(" | "));
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::IoError(format!("Failed to serialize output: {}", e)))?;
    println!("{}", output);
    Ok(())
}

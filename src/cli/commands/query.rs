//! Query command: the final filtered read
//!
//! Requires at least one constrained dimension. Prints the statement and its
//! bound values to stderr, and the rows to stdout.

use std::path::PathBuf;

use super::{FilterArgs, Workspace, parse_format};
use crate::cli::error::CliError;
use crate::store::{OutputFormat, format_query_result, read_filtered};

/// Query command arguments
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub workspace: PathBuf,
    pub filters: FilterArgs,
    pub format: String,
}

/// Run the filtered read and print its rows
pub fn handle_query(args: &QueryArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let state = args.filters.to_state()?;
    let workspace = Workspace::open(&args.workspace)?;
    let columns = workspace.bound_columns()?;

    let filtered = read_filtered(&workspace.store, &columns, &state)?;

    eprintln!("{}", filtered.sql);
    eprintln!("params: {:?}", filtered.params);
    println!("{}", format_query_result(&filtered.result, output_format));

    if output_format != OutputFormat::Json {
        eprintln!("\nExecution time: {}ms", filtered.result.execution_time_ms);
    }
    Ok(())
}

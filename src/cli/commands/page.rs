//! Page command: unfiltered rows in insertion order

use std::path::PathBuf;

use super::{Workspace, parse_format};
use crate::cli::error::CliError;
use crate::store::{OutputFormat, format_query_result, read_page};

/// Page command arguments
#[derive(Debug, Clone)]
pub struct PageArgs {
    pub workspace: PathBuf,
    pub limit: i64,
    pub offset: i64,
    pub format: String,
}

/// Print one window of rows
pub fn handle_page(args: &PageArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let workspace = Workspace::open(&args.workspace)?;

    let result = read_page(&workspace.store, workspace.table(), args.limit, args.offset)?;
    println!("{}", format_query_result(&result, output_format));

    if output_format != OutputFormat::Json {
        eprintln!("\nExecution time: {}ms", result.execution_time_ms);
    }
    Ok(())
}

//! Schema command

use std::path::Path;

use super::{Workspace, parse_format};
use crate::cli::error::CliError;
use crate::store::{OutputFormat, QueryResult, format_query_result};

/// Print the columns of the workspace table with their types and row count
pub fn handle_schema(workspace: &Path, format: &str) -> Result<(), CliError> {
    let output_format = parse_format(format)?;
    let workspace = Workspace::open(workspace)?;
    let schema = workspace.store.table_schema(workspace.table())?;

    let rows = schema
        .columns
        .iter()
        .map(|c| serde_json::json!({ "column": c.name, "type": c.column_type.sql_type() }))
        .collect();
    let result = QueryResult::new(vec!["column".to_string(), "type".to_string()], rows);
    println!("{}", format_query_result(&result, output_format));

    if output_format != OutputFormat::Json {
        let count = workspace.store.row_count(workspace.table())?;
        println!("\n{} rows in '{}'", count, workspace.table());
    }
    Ok(())
}

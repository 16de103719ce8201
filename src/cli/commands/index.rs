//! Index command

use std::path::Path;

use super::Workspace;
use crate::cli::error::CliError;
use crate::store::build_indexes;

/// Build the secondary indexes of the workspace table
pub fn handle_index(workspace: &Path) -> Result<(), CliError> {
    let workspace = Workspace::open(workspace)?;
    let report = build_indexes(&workspace.store, workspace.table())?;

    for name in &report.created {
        println!("created  {}", name);
    }
    for name in &report.existing {
        println!("present  {}", name);
    }
    if report.all().is_empty() {
        println!(
            "Table '{}' has no integer or date columns to index",
            workspace.table()
        );
    }
    Ok(())
}

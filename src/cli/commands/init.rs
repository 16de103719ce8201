//! Init command: write a `.despesas.toml` into a workspace

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::config::{AppConfig, CONFIG_FILENAME, sample_config};

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    pub workspace: PathBuf,
    /// Table name written to `[store]`
    pub table: Option<String>,
    /// Source directory written to `[ingest]`
    pub source: Option<String>,
    /// Overwrite an existing configuration
    pub force: bool,
}

/// Write the commented sample configuration, or a generated one when values are given
pub fn handle_init(args: &InitArgs) -> Result<PathBuf, CliError> {
    let workspace = args.workspace.as_path();
    if !workspace.is_dir() {
        return Err(CliError::DirectoryNotFound(workspace.to_path_buf()));
    }
    if AppConfig::exists(workspace) && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists in {} (use --force to overwrite)",
            CONFIG_FILENAME,
            workspace.display()
        )));
    }

    if args.table.is_none() && args.source.is_none() {
        write_sample(workspace)?;
    } else {
        let mut config = AppConfig::new();
        if let Some(table) = &args.table {
            config.store.table = table.clone();
        }
        if let Some(source) = &args.source {
            config.ingest.source_dir = source.clone();
        }
        config.save(workspace)?;
    }

    let path = workspace.join(CONFIG_FILENAME);
    println!("Wrote {}", path.display());
    Ok(path)
}

fn write_sample(workspace: &Path) -> Result<(), CliError> {
    std::fs::write(workspace.join(CONFIG_FILENAME), sample_config())
        .map_err(|e| CliError::IoError(format!("Failed to write config: {}", e)))
}

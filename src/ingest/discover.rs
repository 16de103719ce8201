//! Input file discovery

use std::path::{Path, PathBuf};

use glob::MatchOptions;

use super::IngestError;

/// Files in `base_path` matching `primary`, or `fallback` when `primary` matches nothing
///
/// Results are sorted by path so repeated runs ingest in the same order.
/// Hidden files (such as Spark's `.part-*.crc` checksums) only match a pattern
/// that itself starts with a dot.
pub fn discover_files(
    base_path: &Path,
    primary: &str,
    fallback: Option<&str>,
) -> Result<Vec<PathBuf>, IngestError> {
    let files = glob_files(base_path, primary)?;
    if !files.is_empty() {
        return Ok(files);
    }

    match fallback {
        Some(pattern) => {
            tracing::info!(
                "No files match {} in {}, falling back to {}",
                primary,
                base_path.display(),
                pattern
            );
            glob_files(base_path, pattern)
        }
        None => Ok(files),
    }
}

fn glob_files(base_path: &Path, pattern: &str) -> Result<Vec<PathBuf>, IngestError> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        base_path.join(pattern).display().to_string()
    };

    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob::glob_with(&full_pattern, options)
        .map_err(|e| IngestError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing path: {}", e);
            }
        }
    }

    files.sort();
    Ok(files)
}

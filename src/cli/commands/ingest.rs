//! Ingest command
//!
//! Discovers the Parquet files of the workspace, loads them into the store and
//! builds the secondary indexes.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use super::{Workspace, parse_format};
use crate::cli::error::CliError;
use crate::ingest::{
    BatchProgress, IngestPipeline, IngestProgress, IngestStats, discover_files, ensure_ingested,
};
use crate::store::{OutputFormat, build_indexes};

/// Ingest command arguments
#[derive(Debug, Clone)]
pub struct IngestArgs {
    pub workspace: PathBuf,
    /// Source directory, overriding `[ingest].source_dir`
    pub source: Option<PathBuf>,
    /// Primary glob, overriding `[ingest].pattern`
    pub pattern: Option<String>,
    /// Re-ingest even when the table already exists
    pub force: bool,
    pub format: String,
}

/// Progress bar over the files of a run
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl IngestProgress for BarProgress {
    fn on_start(&mut self, total_files: usize) {
        let bar = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  Ingesting  {bar:40.cyan/blue} {pos}/{len} files [{elapsed_precise}] {msg}",
        ) {
            bar.set_style(style.progress_chars("##-"));
        }
        self.bar = bar;
    }

    fn on_batch(&mut self, progress: &BatchProgress<'_>) {
        let name = progress
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(format!(
            "{} row group {}/{}",
            name,
            progress.row_group + 1,
            progress.row_groups_in_file
        ));
    }

    fn on_file(&mut self, _path: &Path, files_done: usize, _fraction: f64) {
        self.bar.set_position(files_done as u64);
    }

    fn on_finish(&mut self, _stats: &IngestStats) {
        self.bar.finish_and_clear();
    }
}

/// Handle the ingest command
pub fn handle_ingest(args: &IngestArgs) -> Result<(), CliError> {
    let output_format = parse_format(&args.format)?;
    let workspace = Workspace::open(&args.workspace)?;
    let config = &workspace.config;

    let source_dir = match &args.source {
        Some(dir) => dir.clone(),
        None => config.source_dir(&workspace.path),
    };
    if !source_dir.is_dir() {
        return Err(CliError::DirectoryNotFound(source_dir));
    }

    let pattern = args.pattern.as_deref().unwrap_or(&config.ingest.pattern);
    let files = discover_files(
        &source_dir,
        pattern,
        config.ingest.fallback_pattern.as_deref(),
    )?;
    tracing::info!("Found {} files in {}", files.len(), source_dir.display());

    let pipeline = IngestPipeline::new(workspace.table()).with_batch_size(config.ingest.batch_size);
    let mut progress = BarProgress::new();

    let (stats, indexes) = if args.force {
        let stats = pipeline.ingest(&workspace.store, &files, &mut progress)?;
        let indexes = build_indexes(&workspace.store, workspace.table())?;
        (Some(stats), indexes)
    } else {
        let bootstrap = ensure_ingested(&workspace.store, &pipeline, &files, &mut progress)?;
        (bootstrap.ingested, bootstrap.indexes)
    };

    if output_format == OutputFormat::Json {
        let output = serde_json::json!({
            "table": workspace.table(),
            "ingested": stats,
            "indexes": indexes,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::IoError(format!("Failed to serialize output: {}", e)))?
        );
        return Ok(());
    }

    match stats {
        Some(stats) => {
            println!(
                "Ingested {} records from {} files ({} row groups) into '{}' in {}",
                stats.records_ingested,
                stats.files_processed,
                stats.row_groups_processed,
                workspace.table(),
                stats.duration_string()
            );
            println!("Throughput: {:.0} records/s", stats.throughput());
        }
        None => println!(
            "Table '{}' already present, skipped ingestion (use --force to reload)",
            workspace.table()
        ),
    }
    for name in &indexes.created {
        println!("Created index {}", name);
    }
    Ok(())
}

//! Ingestion pipeline
//!
//! Reads every row-group of every input file in order and writes it into the
//! target table. The first batch of a run recreates the table; later batches
//! append. The whole run is one transaction, so a failed run leaves the
//! previous table (or no table) in place.

use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::array::RecordBatch;
use serde::{Deserialize, Serialize};

use super::reader::{BatchReader, DEFAULT_BATCH_SIZE};
use super::{IngestError, IngestStats};
use crate::store::{
    DEFAULT_TABLE, IndexReport, Store, StoreError, StoreWriter, WriteMode, build_indexes,
};

/// Progress after one row-group has been written
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    /// 0-based index of the file in the run
    pub file_index: usize,
    pub total_files: usize,
    pub path: &'a Path,
    /// 0-based row-group index within the file
    pub row_group: usize,
    pub row_groups_in_file: usize,
    /// Rows in this row-group
    pub rows: usize,
}

impl BatchProgress<'_> {
    /// Fraction of this file's row-groups written so far
    pub fn file_fraction(&self) -> f64 {
        if self.row_groups_in_file == 0 {
            1.0
        } else {
            (self.row_group + 1) as f64 / self.row_groups_in_file as f64
        }
    }
}

/// Observer of an ingestion run
///
/// Callbacks cannot fail the run.
pub trait IngestProgress {
    fn on_start(&mut self, _total_files: usize) {}

    fn on_batch(&mut self, _progress: &BatchProgress<'_>) {}

    /// Called after each file with the fraction of files completed
    fn on_file(&mut self, _path: &Path, _files_done: usize, _fraction: f64) {}

    fn on_finish(&mut self, _stats: &IngestStats) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl IngestProgress for NoopProgress {}

/// Observer that reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl IngestProgress for LogProgress {
    fn on_start(&mut self, total_files: usize) {
        tracing::info!("Starting ingestion of {} files", total_files);
    }

    fn on_batch(&mut self, progress: &BatchProgress<'_>) {
        tracing::debug!(
            "File {}/{} {}: row group {}/{} ({} rows)",
            progress.file_index + 1,
            progress.total_files,
            progress.path.display(),
            progress.row_group + 1,
            progress.row_groups_in_file,
            progress.rows
        );
    }

    fn on_file(&mut self, path: &Path, files_done: usize, fraction: f64) {
        tracing::info!(
            "Finished {} ({} files, {:.0}%)",
            path.display(),
            files_done,
            fraction * 100.0
        );
    }

    fn on_finish(&mut self, stats: &IngestStats) {
        tracing::info!(
            "Ingested {} records from {} files in {}",
            stats.records_ingested,
            stats.files_processed,
            stats.duration_string()
        );
    }
}

/// Loads Parquet files into one table
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    table: String,
    batch_size: usize,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE)
    }
}

impl IngestPipeline {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Rows decoded per chunk when reading a row-group
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replace the table with the contents of `files`, in order
    pub fn ingest(
        &self,
        store: &Store,
        files: &[PathBuf],
        progress: &mut dyn IngestProgress,
    ) -> Result<IngestStats, IngestError> {
        if files.is_empty() {
            return Err(IngestError::NoFilesFound);
        }

        let start = Instant::now();
        let total_files = files.len();
        progress.on_start(total_files);

        let mut stats = store.with_transaction(|conn| -> Result<IngestStats, IngestError> {
            let mut stats = IngestStats::new();
            let mut writer = StoreWriter::new(conn, &self.table);
            let mut first_schema: Option<RecordBatch> = None;

            for (file_index, path) in files.iter().enumerate() {
                let reader = BatchReader::open(path)?.with_batch_size(self.batch_size);
                let row_groups_in_file = reader.num_row_groups();
                if first_schema.is_none() {
                    first_schema = Some(reader.empty_batch());
                }

                for (row_group, batch) in reader.batches().enumerate() {
                    let batch = batch?;
                    let mode = if writer.is_created() {
                        WriteMode::Append
                    } else {
                        WriteMode::Create
                    };
                    let rows = writer
                        .write(&batch, mode)
                        .map_err(|e| batch_error(e, path, row_group))?;

                    stats.row_groups_processed += 1;
                    stats.records_ingested += rows;
                    progress.on_batch(&BatchProgress {
                        file_index,
                        total_files,
                        path,
                        row_group,
                        row_groups_in_file,
                        rows,
                    });
                }

                stats.files_processed += 1;
                stats.bytes_processed += std::fs::metadata(path)?.len();
                progress.on_file(
                    path,
                    stats.files_processed,
                    stats.files_processed as f64 / total_files as f64,
                );
            }

            // Files without row-groups still define the table
            if !writer.is_created()
                && let Some(empty) = &first_schema
            {
                writer
                    .write(empty, WriteMode::Create)
                    .map_err(|e| batch_error(e, &files[0], 0))?;
            }

            Ok(stats)
        })?;

        stats.duration = start.elapsed();
        tracing::info!(
            "Ingested {} records ({} row groups) into {} in {}",
            stats.records_ingested,
            stats.row_groups_processed,
            self.table,
            stats.duration_string()
        );
        progress.on_finish(&stats);
        Ok(stats)
    }
}

fn batch_error(error: StoreError, path: &Path, row_group: usize) -> IngestError {
    match error {
        StoreError::SchemaMismatch(detail) => IngestError::SchemaMismatch {
            path: path.to_path_buf(),
            row_group,
            detail,
        },
        StoreError::UnsupportedType { column, data_type } => IngestError::SchemaMismatch {
            path: path.to_path_buf(),
            row_group,
            detail: format!("column '{}' has unsupported type {}", column, data_type),
        },
        other => IngestError::Store(other),
    }
}

/// Outcome of [`ensure_ingested`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    /// Stats of the ingestion run, `None` when the table already existed
    pub ingested: Option<IngestStats>,
    pub indexes: IndexReport,
}

/// Ingest `files` only when the table is absent, then build its indexes
pub fn ensure_ingested(
    store: &Store,
    pipeline: &IngestPipeline,
    files: &[PathBuf],
    progress: &mut dyn IngestProgress,
) -> Result<Bootstrap, IngestError> {
    let ingested = if store.table_exists(pipeline.table())? {
        tracing::info!("Table {} already present, skipping ingestion", pipeline.table());
        None
    } else {
        Some(pipeline.ingest(store, files, progress)?)
    };

    let indexes = build_indexes(store, pipeline.table())?;
    Ok(Bootstrap { ingested, indexes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;
    use std::fs::File;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_file(path: &Path, rows: &[(&str, f64)], value_type: DataType) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Ano e mês do lançamento", DataType::Utf8, true),
            Field::new("Valor Pago (R$)", value_type.clone(), true),
        ]));
        let periods = Arc::new(StringArray::from(
            rows.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
        ));
        let values: arrow::array::ArrayRef = match value_type {
            DataType::Utf8 => Arc::new(StringArray::from(
                rows.iter().map(|(_, v)| v.to_string()).collect::<Vec<_>>(),
            )),
            _ => Arc::new(Float64Array::from(
                rows.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            )),
        };
        let batch = RecordBatch::try_new(schema.clone(), vec![periods, values]).unwrap();

        let props = WriterProperties::builder()
            .set_max_row_group_size(2)
            .build();
        let mut writer =
            ArrowWriter::try_new(File::create(path).unwrap(), schema, Some(props)).unwrap();
        if !rows.is_empty() {
            writer.write(&batch).unwrap();
        }
        writer.close().unwrap();
    }

    #[derive(Default)]
    struct Recorder {
        started: Option<usize>,
        batches: Vec<(usize, usize, usize, usize)>,
        fractions: Vec<f64>,
        finished: bool,
    }

    impl IngestProgress for Recorder {
        fn on_start(&mut self, total_files: usize) {
            self.started = Some(total_files);
        }

        fn on_batch(&mut self, p: &BatchProgress<'_>) {
            self.batches
                .push((p.file_index, p.row_group, p.row_groups_in_file, p.rows));
        }

        fn on_file(&mut self, _path: &Path, _files_done: usize, fraction: f64) {
            self.fractions.push(fraction);
        }

        fn on_finish(&mut self, _stats: &IngestStats) {
            self.finished = true;
        }
    }

    fn fixture(dir: &TempDir) -> Vec<PathBuf> {
        let a = dir.path().join("a.parquet");
        let b = dir.path().join("b.parquet");
        write_file(
            &a,
            &[("2022-01", 1.0), ("2022-02", 2.0), ("2022-03", 3.0)],
            DataType::Float64,
        );
        write_file(&b, &[("2023-01", 4.0), ("2023-02", 5.0)], DataType::Float64);
        vec![a, b]
    }

    #[test]
    fn test_ingest_reports_progress() {
        let dir = TempDir::new().unwrap();
        let files = fixture(&dir);
        let store = Store::in_memory().unwrap();
        let mut recorder = Recorder::default();

        let stats = IngestPipeline::default()
            .ingest(&store, &files, &mut recorder)
            .unwrap();

        assert_eq!(stats.records_ingested, 5);
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.row_groups_processed, 3);
        assert_eq!(store.row_count("despesas").unwrap(), 5);

        assert_eq!(recorder.started, Some(2));
        assert_eq!(
            recorder.batches,
            vec![(0, 0, 2, 2), (0, 1, 2, 1), (1, 0, 1, 2)]
        );
        assert_eq!(recorder.fractions, vec![0.5, 1.0]);
        assert!(recorder.finished);
    }

    #[test]
    fn test_empty_file_list() {
        let store = Store::in_memory().unwrap();
        let result = IngestPipeline::default().ingest(&store, &[], &mut NoopProgress);
        assert!(matches!(result, Err(IngestError::NoFilesFound)));
        assert!(!store.table_exists("despesas").unwrap());
    }

    #[test]
    fn test_schema_mismatch_keeps_previous_table() {
        let dir = TempDir::new().unwrap();
        let files = fixture(&dir);
        let store = Store::in_memory().unwrap();
        let pipeline = IngestPipeline::default();
        pipeline.ingest(&store, &files, &mut NoopProgress).unwrap();

        let bad = dir.path().join("c.parquet");
        write_file(&bad, &[("2024-01", 9.0)], DataType::Utf8);
        let mut with_bad = files.clone();
        with_bad.push(bad.clone());

        let result = pipeline.ingest(&store, &with_bad, &mut NoopProgress);
        match result {
            Err(IngestError::SchemaMismatch {
                path, row_group, ..
            }) => {
                assert_eq!(path, bad);
                assert_eq!(row_group, 0);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
        assert_eq!(store.row_count("despesas").unwrap(), 5);
    }

    #[test]
    fn test_read_failure_aborts_without_table() {
        let dir = TempDir::new().unwrap();
        let mut files = fixture(&dir);
        let broken = dir.path().join("broken.parquet");
        std::fs::write(&broken, b"garbage").unwrap();
        files.push(broken);

        let store = Store::in_memory().unwrap();
        let result = IngestPipeline::default().ingest(&store, &files, &mut NoopProgress);
        assert!(matches!(result, Err(IngestError::ReadFailure { .. })));
        assert!(!store.table_exists("despesas").unwrap());
    }

    #[test]
    fn test_files_without_rows_create_empty_table() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.parquet");
        write_file(&empty, &[], DataType::Float64);

        let store = Store::in_memory().unwrap();
        let stats = IngestPipeline::default()
            .ingest(&store, &[empty], &mut NoopProgress)
            .unwrap();

        assert_eq!(stats.records_ingested, 0);
        assert_eq!(store.row_count("despesas").unwrap(), 0);
        assert_eq!(store.table_schema("despesas").unwrap().columns.len(), 2);
    }

    #[test]
    fn test_ensure_ingested_runs_once() {
        let dir = TempDir::new().unwrap();
        let files = fixture(&dir);
        let store = Store::in_memory().unwrap();
        let pipeline = IngestPipeline::default();

        let first = ensure_ingested(&store, &pipeline, &files, &mut NoopProgress).unwrap();
        assert_eq!(first.ingested.map(|s| s.records_ingested), Some(5));

        let second = ensure_ingested(&store, &pipeline, &[], &mut NoopProgress).unwrap();
        assert!(second.ingested.is_none());
        assert!(second.indexes.created.is_empty());
        assert_eq!(store.row_count("despesas").unwrap(), 5);
    }
}

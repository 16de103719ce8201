//! Row-group batch reader
//!
//! Opens one Parquet file, reads its footer once and materializes each
//! row-group on demand as a single [`RecordBatch`].

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder,
};

use super::IngestError;

/// Default number of rows decoded per chunk inside a row-group
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Reader over the row-groups of one Parquet file
pub struct BatchReader {
    path: PathBuf,
    file: File,
    metadata: ArrowReaderMetadata,
    batch_size: usize,
}

impl BatchReader {
    /// Open `path` and read its footer
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| IngestError::ReadFailure {
            path: path.clone(),
            row_group: None,
            error: e.to_string(),
        })?;
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::default())
            .map_err(|e| IngestError::ReadFailure {
                path: path.clone(),
                row_group: None,
                error: e.to_string(),
            })?;

        Ok(Self {
            path,
            file,
            metadata,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the decode chunk size (rows)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arrow schema of the file
    pub fn schema(&self) -> SchemaRef {
        self.metadata.schema().clone()
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.metadata().num_row_groups()
    }

    /// Total rows across all row-groups
    pub fn num_rows(&self) -> i64 {
        self.metadata
            .metadata()
            .row_groups()
            .iter()
            .map(|rg| rg.num_rows())
            .sum()
    }

    /// A zero-row batch carrying the file schema
    pub fn empty_batch(&self) -> RecordBatch {
        RecordBatch::new_empty(self.schema())
    }

    /// Decode row-group `index` into one batch
    pub fn read_row_group(&self, index: usize) -> Result<RecordBatch, IngestError> {
        let failure = |error: String| IngestError::ReadFailure {
            path: self.path.clone(),
            row_group: Some(index),
            error,
        };

        if index >= self.num_row_groups() {
            return Err(failure(format!(
                "row group out of range (file has {})",
                self.num_row_groups()
            )));
        }

        let file = self.file.try_clone().map_err(|e| failure(e.to_string()))?;
        let reader = ParquetRecordBatchReaderBuilder::new_with_metadata(file, self.metadata.clone())
            .with_row_groups(vec![index])
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| failure(e.to_string()))?;

        let mut chunks = reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| failure(e.to_string()))?;

        if chunks.len() == 1 {
            return Ok(chunks.swap_remove(0));
        }
        arrow::compute::concat_batches(&self.schema(), &chunks).map_err(|e| failure(e.to_string()))
    }

    /// Lazily decode every row-group in order
    pub fn batches(&self) -> impl Iterator<Item = Result<RecordBatch, IngestError>> + '_ {
        (0..self.num_row_groups()).map(move |index| self.read_row_group(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use parquet::arrow::ArrowWriter;
    use parquet::file::properties::WriterProperties;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_fixture(path: &Path, rows: i64, row_group_size: usize) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from((0..rows).collect::<Vec<_>>())),
                Arc::new(StringArray::from(
                    (0..rows).map(|i| format!("row {}", i)).collect::<Vec<_>>(),
                )),
            ],
        )
        .unwrap();

        let props = WriterProperties::builder()
            .set_max_row_group_size(row_group_size)
            .build();
        let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, Some(props)).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_reads_each_row_group() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.parquet");
        write_fixture(&path, 10, 4);

        let reader = BatchReader::open(&path).unwrap();
        assert_eq!(reader.num_row_groups(), 3);
        assert_eq!(reader.num_rows(), 10);

        let sizes: Vec<usize> = reader
            .batches()
            .map(|b| b.unwrap().num_rows())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let last = reader.read_row_group(2).unwrap();
        let ids = last.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.value(0), 8);
    }

    #[test]
    fn test_small_decode_chunks_are_concatenated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.parquet");
        write_fixture(&path, 10, 10);

        let reader = BatchReader::open(&path).unwrap().with_batch_size(3);
        let batch = reader.read_row_group(0).unwrap();
        assert_eq!(batch.num_rows(), 10);
    }

    #[test]
    fn test_read_failures() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.parquet");
        assert!(matches!(
            BatchReader::open(&missing),
            Err(IngestError::ReadFailure { row_group: None, .. })
        ));

        let garbage = dir.path().join("garbage.parquet");
        std::fs::write(&garbage, b"not parquet at all").unwrap();
        assert!(matches!(
            BatchReader::open(&garbage),
            Err(IngestError::ReadFailure { .. })
        ));

        let path = dir.path().join("data.parquet");
        write_fixture(&path, 3, 10);
        let reader = BatchReader::open(&path).unwrap();
        assert!(matches!(
            reader.read_row_group(5),
            Err(IngestError::ReadFailure { row_group: Some(5), .. })
        ));
    }
}

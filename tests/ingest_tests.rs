//! Integration tests for Parquet ingestion and index building

mod common;

use std::sync::Arc;

use arrow::array::{Decimal128Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use despesas_explorer::ingest::NoopProgress;
use despesas_explorer::{
    IngestError, IngestPipeline, Store, StoreError, build_indexes, discover_files,
    ensure_ingested, read_page,
};
use tempfile::TempDir;

fn all_rows(store: &Store) -> Vec<serde_json::Value> {
    store
        .query("SELECT * FROM despesas ORDER BY rowid", [])
        .unwrap()
        .rows
}

#[test]
fn test_ingest_preserves_file_and_row_group_order() {
    let dir = TempDir::new().unwrap();
    let files = common::sample_files(dir.path());
    let store = Store::in_memory().unwrap();

    let stats = IngestPipeline::default()
        .ingest(&store, &files, &mut NoopProgress)
        .unwrap();
    assert_eq!(stats.records_ingested, 5);
    assert_eq!(stats.row_groups_processed, 3);

    let periods: Vec<_> = all_rows(&store)
        .iter()
        .map(|r| r["Ano e mês do lançamento"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        periods,
        vec!["2022-01", "2022-02", "2022-04", "2023-02", "2023-12"]
    );
}

#[test]
fn test_reingestion_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let files = common::sample_files(dir.path());
    let store = Store::in_memory().unwrap();
    let pipeline = IngestPipeline::default();

    pipeline.ingest(&store, &files, &mut NoopProgress).unwrap();
    let first = all_rows(&store);
    pipeline.ingest(&store, &files, &mut NoopProgress).unwrap();
    let second = all_rows(&store);

    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn test_divergent_file_is_rejected_and_previous_table_survives() {
    let dir = TempDir::new().unwrap();
    let mut files = common::sample_files(dir.path());
    let store = Store::in_memory().unwrap();
    let pipeline = IngestPipeline::default();
    pipeline.ingest(&store, &files, &mut NoopProgress).unwrap();

    let divergent = dir.path().join("part-2.parquet");
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new(
            "Coluna Nova",
            DataType::Utf8,
            true,
        )])),
        vec![Arc::new(StringArray::from(vec!["x"]))],
    )
    .unwrap();
    common::write_batch(&divergent, &batch, 10);
    files.push(divergent);

    let err = pipeline.ingest(&store, &files, &mut NoopProgress).unwrap_err();
    assert!(matches!(err, IngestError::SchemaMismatch { .. }));
    assert_eq!(store.row_count("despesas").unwrap(), 5);
}

#[test]
fn test_no_files_leaves_store_untouched() {
    let store = Store::in_memory().unwrap();
    let err = IngestPipeline::default()
        .ingest(&store, &[], &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, IngestError::NoFilesFound));
    assert!(!store.table_exists("despesas").unwrap());
}

#[test]
fn test_ensure_ingested_builds_indexes_once() {
    let dir = TempDir::new().unwrap();
    let files = common::sample_files(dir.path());
    let store = Store::in_memory().unwrap();
    let pipeline = IngestPipeline::default();

    let bootstrap = ensure_ingested(&store, &pipeline, &files, &mut NoopProgress).unwrap();
    assert_eq!(bootstrap.ingested.map(|s| s.records_ingested), Some(5));
    assert_eq!(bootstrap.indexes.created, vec!["idx_despesas_Código_Ação"]);

    let again = build_indexes(&store, "despesas").unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.existing, vec!["idx_despesas_Código_Ação"]);
}

#[test]
fn test_file_store_persists_between_handles() {
    let dir = TempDir::new().unwrap();
    let files = common::sample_files(dir.path());
    let db_path = dir.path().join("despesas.duckdb");

    {
        let store = Store::open(&db_path).unwrap();
        IngestPipeline::default()
            .ingest(&store, &files, &mut NoopProgress)
            .unwrap();
    }

    let store = Store::open(&db_path).unwrap();
    assert!(!store.is_in_memory());
    assert_eq!(store.row_count("despesas").unwrap(), 5);
}

#[test]
fn test_discovery_feeds_ingestion() {
    let dir = TempDir::new().unwrap();
    common::sample_files(dir.path());

    let files = discover_files(dir.path(), "*.crc", Some("*.parquet")).unwrap();
    assert_eq!(files.len(), 2);

    let store = Store::in_memory().unwrap();
    IngestPipeline::new("gastos")
        .ingest(&store, &files, &mut NoopProgress)
        .unwrap();
    assert_eq!(store.row_count("gastos").unwrap(), 5);
    assert!(!store.table_exists("despesas").unwrap());
}

#[test]
fn test_hidden_checksum_files_are_not_ingested() {
    let dir = TempDir::new().unwrap();
    common::sample_files(dir.path());
    std::fs::write(dir.path().join(".part-0.parquet.crc"), b"checksum").unwrap();
    std::fs::write(dir.path().join(".part-1.parquet.crc"), b"checksum").unwrap();

    let files = discover_files(dir.path(), "*.crc", Some("*.parquet")).unwrap();
    let store = Store::in_memory().unwrap();
    let stats = IngestPipeline::default()
        .ingest(&store, &files, &mut NoopProgress)
        .unwrap();
    assert_eq!(stats.files_processed, 2);
    assert_eq!(store.row_count("despesas").unwrap(), 5);
}

#[test]
fn test_exact_numeric_values_survive_ingestion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("valores.parquet");
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![
            Field::new("Valor Pago (R$)", DataType::Decimal128(38, 2), true),
            Field::new("Sequencial", DataType::UInt64, true),
        ])),
        vec![
            Arc::new(
                Decimal128Array::from(vec![12_345_678_901_234_567_i128, 5])
                    .with_precision_and_scale(38, 2)
                    .unwrap(),
            ),
            Arc::new(UInt64Array::from(vec![u64::MAX, 5])),
        ],
    )
    .unwrap();
    common::write_batch(&path, &batch, 1);

    let store = Store::in_memory().unwrap();
    IngestPipeline::default()
        .ingest(&store, &[path], &mut NoopProgress)
        .unwrap();

    let rows = store
        .query(
            "SELECT CAST(\"Valor Pago (R$)\" AS VARCHAR) AS valor, \
             CAST(\"Sequencial\" AS VARCHAR) AS sequencial FROM despesas ORDER BY rowid",
            [],
        )
        .unwrap()
        .rows;
    assert_eq!(rows[0]["valor"], serde_json::json!("123456789012345.67"));
    assert_eq!(rows[0]["sequencial"], serde_json::json!(u64::MAX.to_string()));
    assert_eq!(rows[1]["valor"], serde_json::json!("0.05"));
    assert_eq!(rows[1]["sequencial"], serde_json::json!("5"));
}

#[test]
fn test_paginated_window() {
    let dir = TempDir::new().unwrap();
    let files = common::sample_files(dir.path());
    let store = Store::in_memory().unwrap();
    IngestPipeline::default()
        .ingest(&store, &files, &mut NoopProgress)
        .unwrap();

    let page = read_page(&store, "despesas", 2, 1).unwrap();
    let periods: Vec<_> = page
        .column_values("Ano e mês do lançamento")
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(
        periods,
        vec![serde_json::json!("2022-02"), serde_json::json!("2022-04")]
    );

    assert!(matches!(
        read_page(&store, "despesas", 0, 0),
        Err(StoreError::InvalidPagination { .. })
    ));
}

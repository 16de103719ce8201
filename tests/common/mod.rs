//! Shared Parquet fixtures for integration tests

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int32Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

/// One expense record
#[derive(Debug, Clone)]
pub struct Expense {
    pub period: &'static str,
    pub action: &'static str,
    pub organ: &'static str,
    pub plan: &'static str,
    pub category: &'static str,
    pub author: Option<&'static str>,
    pub code: i32,
    pub value: f64,
}

pub fn expense(period: &'static str, action: &'static str, organ: &'static str) -> Expense {
    Expense {
        period,
        action,
        organ,
        plan: "Plano A",
        category: "Despesas Correntes",
        author: None,
        code: 100,
        value: 1.0,
    }
}

pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("Ano e mês do lançamento", DataType::Utf8, true),
        Field::new("Código Ação", DataType::Int32, true),
        Field::new("Nome Ação", DataType::Utf8, true),
        Field::new("Nome Órgão Superior", DataType::Utf8, true),
        Field::new("Plano Orçamentário", DataType::Utf8, true),
        Field::new("Nome Categoria Econômica", DataType::Utf8, true),
        Field::new("Nome Autor Emenda", DataType::Utf8, true),
        Field::new("Valor Pago (R$)", DataType::Float64, true),
    ]))
}

pub fn batch(rows: &[Expense]) -> RecordBatch {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.period).collect::<Vec<_>>(),
        )),
        Arc::new(Int32Array::from(rows.iter().map(|r| r.code).collect::<Vec<_>>())),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.action).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.organ).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(rows.iter().map(|r| r.plan).collect::<Vec<_>>())),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.category).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            rows.iter().map(|r| r.author).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.value).collect::<Vec<_>>(),
        )),
    ];
    RecordBatch::try_new(schema(), columns).unwrap()
}

/// Write `batch` to `path` with at most `row_group_size` rows per row-group
pub fn write_batch(path: &Path, batch: &RecordBatch, row_group_size: usize) {
    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let mut writer =
        ArrowWriter::try_new(File::create(path).unwrap(), batch.schema(), Some(props)).unwrap();
    if batch.num_rows() > 0 {
        writer.write(batch).unwrap();
    }
    writer.close().unwrap();
}

pub fn write_expenses(path: &Path, rows: &[Expense], row_group_size: usize) {
    write_batch(path, &batch(rows), row_group_size);
}

/// Two files, three row-groups, five records
pub fn sample_files(dir: &Path) -> Vec<PathBuf> {
    let first = dir.join("part-0.parquet");
    let second = dir.join("part-1.parquet");
    write_expenses(
        &first,
        &[
            expense("2022-01", "Saúde", "Ministério da Saúde"),
            expense("2022-02", "Educação", "Ministério da Educação"),
            expense("2022-04", "Saúde", "Ministério da Saúde"),
        ],
        2,
    );
    write_expenses(
        &second,
        &[
            Expense {
                author: Some("Autor A"),
                ..expense("2023-02", "Saúde", "Ministério da Educação")
            },
            Expense {
                author: Some("Autor B"),
                plan: "Plano B",
                ..expense("2023-12", "Cultura", "Ministério da Cultura")
            },
        ],
        2,
    );
    vec![first, second]
}

//! Tests for output module

use super::*;
use crate::decode::Record;
use arrow::array::{Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;
use std::fs::File;
use tempfile::tempdir;

fn records(keys: std::ops::Range<i64>) -> Vec<Record> {
    keys.map(|k| Record::new(k, json!({"height": k, "txs": []})))
        .collect()
}

fn read_rows(path: &std::path::Path) -> Vec<(i64, String)> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        let keys = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        let values = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        for i in 0..batch.num_rows() {
            rows.push((keys.value(i), values.value(i).to_string()));
        }
    }
    rows
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_record_batch_schema() {
    let schema = record_batch_schema();
    let key = schema.field_with_name("key").unwrap();
    let value = schema.field_with_name("value").unwrap();

    assert_eq!(key.data_type(), &DataType::Int64);
    assert_eq!(value.data_type(), &DataType::Utf8);
    assert!(!key.is_nullable());
}

#[test]
fn test_records_to_batch() {
    let batch = records_to_batch(&records(10..13)).unwrap();
    assert_eq!(batch.num_rows(), 3);

    let keys = batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(keys.values().to_vec(), vec![10, 11, 12]);

    let values = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    let first: serde_json::Value = serde_json::from_str(values.value(0)).unwrap();
    assert_eq!(first, json!({"height": 10, "txs": []}));
    assert_eq!(values.null_count(), 0);
}

#[test]
fn test_records_to_batch_empty() {
    let batch = records_to_batch(&[]).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 2);
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_parquet_writer_config_builder() {
    let config = ParquetWriterConfig::new()
        .with_row_group_size(1000)
        .uncompressed();
    assert_eq!(config.row_group_size(), 1000);
    assert_eq!(ParquetWriterConfig::default().row_group_size(), 1024 * 1024);
}

#[test]
fn test_parquet_writer_rows_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("writer.parquet");
    let batch = records_to_batch(&records(0..2)).unwrap();

    let config = ParquetWriterConfig::default();
    let mut writer = ParquetWriter::new(&path, &record_batch_schema(), &config).unwrap();
    assert_eq!(writer.rows_written(), 0);

    writer.write(&batch).unwrap();
    assert_eq!(writer.rows_written(), 2);
    assert_eq!(writer.close().unwrap(), 2);

    assert_eq!(read_rows(&path).len(), 2);
}

#[test]
fn test_parquet_sink_one_file_per_stream() {
    let dir = tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path().join("out"), ParquetWriterConfig::new())
        .unwrap()
        .with_batch_size(2);

    for record in records(0..5) {
        sink.push("pool_0", record).unwrap();
    }
    sink.push("pool_1", Record::new(99, json!({"x": 1}))).unwrap();

    let written = sink.finish().unwrap();
    assert_eq!(
        written
            .iter()
            .map(|w| (w.stream.as_str(), w.rows))
            .collect::<Vec<_>>(),
        vec![("pool_0", 5), ("pool_1", 1)]
    );
    assert!(written[0].path.ends_with("out/pool_0.parquet"));

    let rows = read_rows(&written[0].path);
    let keys: Vec<i64> = rows.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![0, 1, 2, 3, 4]);

    let rows = read_rows(&written[1].path);
    assert_eq!(rows, vec![(99, r#"{"x":1}"#.to_string())]);
}

#[test]
fn test_parquet_sink_without_records_writes_nothing() {
    let dir = tempdir().unwrap();
    let sink = ParquetSink::new(dir.path(), ParquetWriterConfig::default()).unwrap();
    assert_eq!(
        sink.path_for("pool_3"),
        dir.path().join("pool_3.parquet")
    );
    assert!(sink.finish().unwrap().is_empty());
    assert!(!dir.path().join("pool_3.parquet").exists());
}

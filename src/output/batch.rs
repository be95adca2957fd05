//! Arrow conversion of pool records

use crate::decode::Record;
use crate::error::Result;
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Arrow schema of pool records: `key` (Int64) and `value` (JSON text)
pub fn record_batch_schema() -> Schema {
    Schema::new(vec![
        Field::new("key", DataType::Int64, false),
        Field::new("value", DataType::Utf8, false),
    ])
}

/// Convert records to an Arrow RecordBatch
///
/// `value` is stored as its JSON serialization, since payload shapes differ
/// between runtimes.
pub fn records_to_batch(records: &[Record]) -> Result<RecordBatch> {
    let schema = Arc::new(record_batch_schema());
    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let keys = Int64Array::from_iter_values(records.iter().map(|r| r.key));
    let values = records
        .iter()
        .map(|r| serde_json::to_string(&r.value))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let values = StringArray::from(values);

    let columns: Vec<ArrayRef> = vec![Arc::new(keys), Arc::new(values)];
    Ok(RecordBatch::try_new(schema, columns)?)
}

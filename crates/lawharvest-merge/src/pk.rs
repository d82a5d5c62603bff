//! Dense integer primary keys for link tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::MergeError;

/// Number rows `1..=N` in a new first column `name`.
///
/// Any existing column called `name` is dropped first, so re-keying an
/// already keyed table gives the same result.
pub fn reassign_primary_key(batch: &RecordBatch, name: &str) -> Result<RecordBatch, MergeError> {
    let schema = batch.schema();
    let rows = batch.num_rows() as i64;

    let mut fields = vec![Arc::new(Field::new(name, DataType::Int64, false))];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(1..=rows))];
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if field.name() != name {
            fields.push(Arc::clone(field));
            columns.push(Arc::clone(column));
        }
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

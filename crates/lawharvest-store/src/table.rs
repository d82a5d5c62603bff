//! Table file I/O and text-table helpers.
//!
//! Scraped tables are handled as "text tables": every column `Utf8`,
//! nullable. Readers cast whatever a file holds (an `itemID` that a CSV
//! reader inferred as integer, a Parquet file written by another tool) to
//! text so that keys from different collectors compare equal.

use std::fs::{self, File};
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray, new_null_array};
use arrow::compute::{cast, concat_batches};
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use lawharvest_core::text_schema;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

/// On-disk encoding of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }

    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(TableFormat::Csv),
            "parquet" => Some(TableFormat::Parquet),
            _ => None,
        }
    }
}

/// Read a CSV or Parquet file as one text table.
pub fn read_table(path: &Path) -> Result<RecordBatch, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    if fs::metadata(path)?.len() == 0 {
        return Err(StoreError::EmptyFile(path.to_path_buf()));
    }
    let batch = match TableFormat::from_path(path) {
        Some(TableFormat::Csv) => read_csv(path)?,
        Some(TableFormat::Parquet) => read_parquet(path)?,
        None => return Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    };
    debug!(rows = batch.num_rows(), path = %path.display(), "read table");
    Ok(batch)
}

fn read_csv(path: &Path) -> Result<RecordBatch, StoreError> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, None)?;
    file.rewind()?;

    // Read every column as text; inference is only used for the header names.
    let names: Vec<&str> = inferred.fields().iter().map(|f| f.name().as_str()).collect();
    let schema: SchemaRef = Arc::new(text_schema(&names));
    let reader = arrow::csv::ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Read a Parquet file into a single text table.
pub fn read_parquet(path: &Path) -> Result<RecordBatch, StoreError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = Arc::clone(builder.schema());
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;
    to_text(&batch)
}

/// Write a table, replacing any existing file at `path`.
///
/// The table is written next to the target and renamed into place, so an
/// interrupted run leaves the previous version intact.
pub fn write_table(path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
    let format =
        TableFormat::from_path(path).ok_or_else(|| StoreError::UnsupportedFormat(path.into()))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(path);
    let file = File::create(&partial)?;
    match format {
        TableFormat::Csv => {
            let mut writer = arrow::csv::WriterBuilder::new()
                .with_header(true)
                .build(file);
            writer.write(batch)?;
        }
        TableFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }
    fs::rename(&partial, path)?;
    debug!(rows = batch.num_rows(), path = %path.display(), "wrote table");
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Cast every column to nullable `Utf8`.
pub fn to_text(batch: &RecordBatch) -> Result<RecordBatch, StoreError> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(schema.fields().len());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let text = if column.data_type() == &DataType::Utf8 {
            Arc::clone(column)
        } else {
            cast(column, &DataType::Utf8)?
        };
        fields.push(Field::new(field.name(), DataType::Utf8, true));
        columns.push(text);
    }

    with_row_count(Arc::new(Schema::new(fields)), columns, batch.num_rows())
}

/// Concatenate text tables whose columns may differ.
///
/// The result has the union of all column names in first-seen order; a
/// table lacking a column contributes nulls. Row order is preserved.
pub fn concat_text(batches: &[RecordBatch]) -> Result<RecordBatch, StoreError> {
    let mut names: Vec<String> = Vec::new();
    for batch in batches {
        for field in batch.schema().fields() {
            if !names.iter().any(|n| n == field.name()) {
                names.push(field.name().clone());
            }
        }
    }
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let schema: SchemaRef = Arc::new(text_schema(&name_refs));

    let mut aligned = Vec::with_capacity(batches.len());
    for batch in batches {
        let text = to_text(batch)?;
        let columns: Vec<ArrayRef> = names
            .iter()
            .map(|name| {
                text.column_by_name(name)
                    .cloned()
                    .unwrap_or_else(|| new_null_array(&DataType::Utf8, text.num_rows()))
            })
            .collect();
        aligned.push(with_row_count(Arc::clone(&schema), columns, text.num_rows())?);
    }

    if aligned.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(concat_batches(&schema, &aligned)?)
}

/// Borrow a column as a string array, if present and textual.
pub fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)?
        .as_any()
        .downcast_ref::<StringArray>()
}

/// Value of a text cell, `None` for null cells.
pub fn cell(column: &StringArray, row: usize) -> Option<&str> {
    if column.is_null(row) {
        None
    } else {
        Some(column.value(row))
    }
}

fn with_row_count(
    schema: SchemaRef,
    columns: Vec<ArrayRef>,
    rows: usize,
) -> Result<RecordBatch, StoreError> {
    let options = RecordBatchOptions::new().with_row_count(Some(rows));
    Ok(RecordBatch::try_new_with_options(schema, columns, &options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{AsArray, Int64Array};
    use tempfile::TempDir;

    fn text_batch(columns: &[(&str, Vec<Option<&str>>)]) -> RecordBatch {
        let names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, v)| Arc::new(v.iter().copied().collect::<StringArray>()) as ArrayRef)
            .collect();
        RecordBatch::try_new(Arc::new(text_schema(&names)), arrays).unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a/merged_result.csv")), Some(TableFormat::Csv));
        assert_eq!(TableFormat::from_path(Path::new("b.PARQUET")), Some(TableFormat::Parquet));
        assert_eq!(TableFormat::from_path(Path::new("c.xlsx")), None);
    }

    #[test]
    fn csv_numeric_ids_read_as_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("batch.csv");
        fs::write(&path, "regionID,itemID,title\nTW,101,Luật A\nTW,102,\n").unwrap();

        let batch = read_table(&path).unwrap();
        assert_eq!(batch.num_rows(), 2);
        let item = text_column(&batch, "itemID").unwrap();
        assert_eq!(item.value(1), "102");
        let title = text_column(&batch, "title").unwrap();
        assert_eq!(cell(title, 0), Some("Luật A"));
        assert_eq!(cell(title, 1).unwrap_or_default(), "");
    }

    #[test]
    fn csv_and_parquet_write_read() {
        let tmp = TempDir::new().unwrap();
        let batch = text_batch(&[
            ("itemID", vec![Some("1"), Some("2")]),
            ("url", vec![Some("https://vbpl.vn/a, b"), None]),
        ]);
        for name in ["t.csv", "t.parquet"] {
            let path = tmp.path().join("nested").join(name);
            write_table(&path, &batch).unwrap();
            let read = read_table(&path).unwrap();
            assert_eq!(read.num_rows(), 2, "{name}");
            assert_eq!(cell(text_column(&read, "url").unwrap(), 0), Some("https://vbpl.vn/a, b"));
            assert!(!partial_path(&path).exists());
        }
    }

    #[test]
    fn missing_and_empty_files() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("none.csv");
        assert!(matches!(read_table(&missing), Err(StoreError::NotFound(_))));

        let empty = tmp.path().join("empty.csv");
        fs::write(&empty, "").unwrap();
        assert!(matches!(read_table(&empty), Err(StoreError::EmptyFile(_))));
    }

    #[test]
    fn to_text_casts_integers() {
        let schema = Arc::new(Schema::new(vec![Field::new("itemID", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![7, 42]))]).unwrap();
        let text = to_text(&batch).unwrap();
        assert_eq!(text.schema().field(0).data_type(), &DataType::Utf8);
        assert_eq!(text.column(0).as_string::<i32>().value(1), "42");
    }

    #[test]
    fn concat_unions_columns_in_order() {
        let a = text_batch(&[("itemID", vec![Some("1")]), ("title", vec![Some("A")])]);
        let b = text_batch(&[("itemID", vec![Some("2")]), ("signer", vec![Some("X")])]);
        let merged = concat_text(&[a, b]).unwrap();

        let names: Vec<&str> = merged
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["itemID", "title", "signer"]);
        assert_eq!(merged.num_rows(), 2);
        assert!(text_column(&merged, "title").unwrap().is_null(1));
        assert!(text_column(&merged, "signer").unwrap().is_null(0));
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let merged = concat_text(&[]).unwrap();
        assert_eq!(merged.num_rows(), 0);
        assert_eq!(merged.num_columns(), 0);
    }
}

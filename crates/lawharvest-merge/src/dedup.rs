//! Duplicate resolution for scraped tables.
//!
//! Two policies exist. Key dedup keeps the last row per key, so the most
//! recent re-scrape wins. Best-record selection groups document-info rows
//! by normalised code and title and keeps the row with the highest
//! information score, so the most complete scrape wins.

use std::collections::HashMap;

use arrow::array::{StringArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use lawharvest_core::{EntityKind, col, normalize_key};
use lawharvest_store::{cell, concat_text, text_column};
use tracing::debug;

use crate::MergeError;
use crate::score::Scorer;

/// How duplicates are resolved for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupPolicy {
    /// Row identity. Empty means no key dedup.
    pub key: Vec<String>,
    /// Run best-record selection after the key pass.
    pub scoring: bool,
}

impl DedupPolicy {
    /// Keep the last row per `key`.
    pub fn keep_last(key: &[&str]) -> Self {
        Self {
            key: key.iter().map(|k| k.to_string()).collect(),
            scoring: false,
        }
    }

    /// The per-collector policy for a kind.
    pub fn for_kind(kind: EntityKind) -> Self {
        Self {
            scoring: kind.scored(),
            ..Self::keep_last(kind.dedup_key())
        }
    }
}

/// Concatenate `batches` in order and resolve duplicates per `policy`.
pub fn canonicalize(batches: &[RecordBatch], policy: &DedupPolicy) -> Result<RecordBatch, MergeError> {
    let combined = concat_text(batches)?;
    let deduped = dedup_keep_last(&combined, &policy.key)?;
    if policy.scoring {
        select_best(&deduped)
    } else {
        Ok(deduped)
    }
}

/// Keep only the last row of every group sharing the same key.
///
/// Key columns missing from the table are ignored; with none left every row
/// is kept. Null cells compare equal to each other. Surviving rows keep
/// their relative order.
pub fn dedup_keep_last<S: AsRef<str>>(batch: &RecordBatch, key: &[S]) -> Result<RecordBatch, MergeError> {
    let columns: Vec<&StringArray> = key
        .iter()
        .filter_map(|name| text_column(batch, name.as_ref()))
        .collect();
    if columns.is_empty() {
        if !key.is_empty() {
            debug!("dedup key columns absent, keeping all rows");
        }
        return Ok(batch.clone());
    }

    let rows = batch.num_rows();
    let keys: Vec<Vec<Option<&str>>> = (0..rows)
        .map(|row| columns.iter().map(|c| cell(c, row)).collect())
        .collect();

    let mut last: HashMap<&[Option<&str>], usize> = HashMap::with_capacity(rows);
    for (row, key) in keys.iter().enumerate() {
        last.insert(key.as_slice(), row);
    }

    let keep: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(row, key)| last[key.as_slice()] == *row)
        .map(|(row, _)| row)
        .collect();

    debug!(before = rows, after = keep.len(), "key dedup");
    take_rows(batch, &keep)
}

struct Candidate {
    code: String,
    title: String,
    score: u32,
    length_hint: usize,
    row: usize,
}

/// Keep the most informative row per normalised (code, title).
///
/// Rows whose code or title normalises to missing are never grouped and
/// pass through unchanged after the selected rows. A table without both
/// columns is returned as is.
pub fn select_best(batch: &RecordBatch) -> Result<RecordBatch, MergeError> {
    let (Some(code), Some(title)) = (text_column(batch, col::CODE), text_column(batch, col::TITLE))
    else {
        return Ok(batch.clone());
    };

    let scorer = Scorer::new(batch);
    let mut scored = Vec::new();
    let mut unscored = Vec::new();
    for row in 0..batch.num_rows() {
        match (normalize_key(cell(code, row)), normalize_key(cell(title, row))) {
            (Some(code), Some(title)) => scored.push(Candidate {
                code,
                title,
                score: scorer.score(row),
                length_hint: scorer.length_hint(row),
                row,
            }),
            _ => unscored.push(row),
        }
    }

    scored.sort_by(|a, b| {
        a.code
            .cmp(&b.code)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| b.score.cmp(&a.score))
            .then_with(|| b.length_hint.cmp(&a.length_hint))
            .then_with(|| b.row.cmp(&a.row))
    });
    scored.dedup_by(|later, first| later.code == first.code && later.title == first.title);

    debug!(
        selected = scored.len(),
        passthrough = unscored.len(),
        "best-record selection"
    );
    let keep: Vec<usize> = scored.iter().map(|c| c.row).chain(unscored).collect();
    take_rows(batch, &keep)
}

/// Rows of `batch` at `indices`, in that order.
pub(crate) fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch, MergeError> {
    let indices: UInt32Array = indices.iter().map(|&i| i as u32).collect();
    Ok(take_record_batch(batch, &indices)?)
}

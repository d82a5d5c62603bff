//! Information score: how much of a document a scrape attempt captured.
//!
//! The portal sometimes serves a detail page with the property table
//! missing, leaving only the code and title. Two visits to the same
//! document can therefore produce rows of very different completeness.
//! The score counts filled fields so the fuller row can be kept.

use arrow::array::StringArray;
use arrow::record_batch::RecordBatch;
use lawharvest_core::{col, is_filled};
use lawharvest_store::{cell, text_column};

/// Fields counted towards the base score.
pub const REFERENCE_FIELDS: &[&str] = &[
    col::CODE,
    col::TITLE,
    col::DOC_TYPE,
    col::ISSUER,
    col::VALIDITY,
    col::ISSUE_DATE,
    col::EFFECTIVE_DATE,
    col::SIGNER_TITLE,
    col::SIGNER,
    col::SCOPE,
    col::ITEM_ID,
    col::REGION_ID,
    col::URL,
];

/// Fields worth one extra point when filled.
pub const BONUS_FIELDS: &[&str] = &[
    col::ISSUE_DATE,
    col::EFFECTIVE_DATE,
    col::VALIDITY,
    col::ISSUER,
];

/// Scores rows of one table. Absent columns count as unfilled.
pub struct Scorer<'a> {
    reference: Vec<Option<&'a StringArray>>,
    bonus: Vec<Option<&'a StringArray>>,
    title: Option<&'a StringArray>,
    issuer: Option<&'a StringArray>,
}

impl<'a> Scorer<'a> {
    pub fn new(batch: &'a RecordBatch) -> Self {
        let lookup = |names: &[&str]| -> Vec<Option<&'a StringArray>> {
            names.iter().map(|name| text_column(batch, name)).collect()
        };
        Self {
            reference: lookup(REFERENCE_FIELDS),
            bonus: lookup(BONUS_FIELDS),
            title: text_column(batch, col::TITLE),
            issuer: text_column(batch, col::ISSUER),
        }
    }

    /// Filled reference fields plus filled bonus fields.
    pub fn score(&self, row: usize) -> u32 {
        let filled = |columns: &[Option<&StringArray>]| {
            columns
                .iter()
                .filter(|column| column.is_some_and(|c| is_filled(cell(c, row))))
                .count() as u32
        };
        filled(&self.reference) + filled(&self.bonus)
    }

    /// Secondary tie-break: characters in title and issuer.
    pub fn length_hint(&self, row: usize) -> usize {
        let len = |column: Option<&StringArray>| {
            column
                .and_then(|c| cell(c, row))
                .map_or(0, |s| s.chars().count())
        };
        len(self.title) + len(self.issuer)
    }
}

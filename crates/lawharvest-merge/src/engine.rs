//! Per-collector merge: batches of one kind into its canonical table.

use std::path::PathBuf;

use lawharvest_core::{EntityKind, col};
use lawharvest_store::{BatchScan, BatchStore};
use tracing::{Span, info, info_span, warn};

use crate::MergeError;
use crate::dedup::{DedupPolicy, canonicalize};
use crate::pk::reassign_primary_key;

/// What a merge of one kind produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No readable batches; the canonical table was left untouched.
    NoInput,
    Merged {
        rows: usize,
        batches: usize,
        skipped: usize,
        path: PathBuf,
    },
}

/// Rebuilds canonical tables for one collector output root.
pub struct MergeEngine {
    store: BatchStore,
    span: Span,
}

impl MergeEngine {
    pub fn new(store: BatchStore) -> Self {
        let span = info_span!("merge", root = %store.root().display());
        Self { store, span }
    }

    /// Use a caller-provided span as the logging context.
    pub fn with_span(store: BatchStore, span: Span) -> Self {
        Self { store, span }
    }

    pub fn store(&self) -> &BatchStore {
        &self.store
    }

    /// Merge every batch of `kind` and replace its canonical table.
    pub fn merge(&self, kind: EntityKind) -> Result<MergeOutcome, MergeError> {
        let _guard = self.span.enter();

        let scan = self.store.scan(kind)?;
        let skipped = match &scan {
            BatchScan::Empty => 0,
            BatchScan::Loaded { skipped, .. } => skipped.len(),
        };
        let batches = scan.batches();
        if batches.is_empty() {
            info!(kind = %kind, skipped, "nothing to merge");
            return Ok(MergeOutcome::NoInput);
        }

        let tables: Vec<_> = batches.iter().map(|b| b.table.clone()).collect();
        let input_rows: usize = tables.iter().map(|t| t.num_rows()).sum();
        let mut merged = canonicalize(&tables, &DedupPolicy::for_kind(kind))?;
        if kind.has_primary_key() {
            merged = reassign_primary_key(&merged, col::ID)?;
        }

        let path = self.store.write_canonical(kind, &merged)?;
        info!(
            kind = %kind,
            batches = batches.len(),
            input_rows,
            rows = merged.num_rows(),
            path = %path.display(),
            "wrote canonical table"
        );
        Ok(MergeOutcome::Merged {
            rows: merged.num_rows(),
            batches: batches.len(),
            skipped,
            path,
        })
    }

    /// Merge several kinds; a failing kind is logged and does not stop the rest.
    pub fn merge_all(&self, kinds: &[EntityKind]) -> Vec<(EntityKind, Result<MergeOutcome, MergeError>)> {
        kinds
            .iter()
            .map(|&kind| {
                let outcome = self.merge(kind);
                if let Err(e) = &outcome {
                    let _guard = self.span.enter();
                    warn!(kind = %kind, error = %e, "merge failed");
                }
                (kind, outcome)
            })
            .collect()
    }
}

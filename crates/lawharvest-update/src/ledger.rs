//! Failure ledger: identifiers whose extraction failed, persisted across runs.
//!
//! The on-disk ledger is a single-column CSV (`url`). A run records failures
//! in memory and flushes them at the end; flushing unions them with whatever
//! is already on disk. Entries are only removed by an explicit `forget`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use lawharvest_core::{col, text_schema};
use lawharvest_store::{StoreError, cell, read_table, text_column, write_table};
use tracing::{debug, info, warn};

use crate::UpdateError;

#[derive(Debug)]
pub struct FailureLedger {
    path: PathBuf,
    pending: Vec<String>,
}

impl FailureLedger {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures recorded in this run and not yet cleared.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Note a failed identifier. Blank identifiers are ignored.
    pub fn record(&mut self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        debug!(id, "recorded failure");
        self.pending.push(id.to_string());
    }

    /// Persisted identifiers, in file order, without repeats.
    ///
    /// A missing ledger is empty. So is an unreadable one, with a warning.
    pub fn load(&self) -> Vec<String> {
        unique(self.persisted())
    }

    fn persisted(&self) -> Vec<String> {
        match read_ids(&self.path) {
            Ok(ids) => ids,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ledger unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Union the persisted ledger with this run's failures and rewrite it.
    ///
    /// Returns the number of persisted entries. The file is rewritten only
    /// when the union differs from what is on disk, so a ledger holding
    /// repeated entries is compacted even on a run without failures.
    pub fn flush(&self) -> Result<usize, UpdateError> {
        let persisted = self.persisted();
        let on_disk = persisted.len();
        let merged = unique(persisted.into_iter().chain(self.pending.iter().cloned()));
        if merged.len() == on_disk {
            return Ok(merged.len());
        }
        write_ids(&self.path, &merged)?;
        info!(
            path = %self.path.display(),
            new = self.pending.len(),
            total = merged.len(),
            "flushed failure ledger"
        );
        Ok(merged.len())
    }

    /// Drop this run's in-memory failures.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Remove identifiers from the persisted ledger. Returns how many were removed.
    pub fn forget<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize, UpdateError> {
        let forgotten: HashSet<&str> = ids.iter().map(|id| id.as_ref().trim()).collect();
        let persisted = self.load();
        let kept: Vec<String> = persisted
            .iter()
            .filter(|id| !forgotten.contains(id.as_str()))
            .cloned()
            .collect();
        let removed = persisted.len() - kept.len();
        if removed > 0 {
            write_ids(&self.path, &kept)?;
            info!(path = %self.path.display(), removed, remaining = kept.len(), "pruned failure ledger");
        }
        Ok(removed)
    }
}

fn unique(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn read_ids(path: &Path) -> Result<Vec<String>, StoreError> {
    let table = read_table(path)?;
    let Some(column) = text_column(&table, col::URL) else {
        return Err(StoreError::Other(format!(
            "{} has no {} column",
            path.display(),
            col::URL
        )));
    };
    let ids: Vec<String> = (0..column.len())
        .filter_map(|row| cell(column, row))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    Ok(ids)
}

fn write_ids(path: &Path, ids: &[String]) -> Result<(), UpdateError> {
    let column: StringArray = ids.iter().map(|id| Some(id.as_str())).collect();
    let batch = RecordBatch::try_new(
        Arc::new(text_schema(&[col::URL])),
        vec![Arc::new(column) as ArrayRef],
    )?;
    write_table(path, &batch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger(tmp: &TempDir) -> FailureLedger {
        FailureLedger::open(tmp.path().join("log").join("failed_urls.csv"))
    }

    #[test]
    fn missing_ledger_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(ledger(&tmp).load().is_empty());
    }

    #[test]
    fn flush_unions_with_persisted() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failed_urls.csv");
        std::fs::write(&path, "url\nu5\nu6\n").unwrap();

        let mut ledger = FailureLedger::open(&path);
        ledger.record("u6");
        ledger.record("u7");
        ledger.record("  ");
        assert_eq!(ledger.flush().unwrap(), 3);
        assert_eq!(ledger.load(), vec!["u5", "u6", "u7"]);

        ledger.clear();
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.flush().unwrap(), 3);
    }

    #[test]
    fn flush_without_failures_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let ledger = ledger(&tmp);
        assert_eq!(ledger.flush().unwrap(), 0);
        assert!(!ledger.path().exists());
    }

    #[test]
    fn flush_compacts_repeated_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failed_urls.csv");
        std::fs::write(&path, "url\nu1\nu1\nu2\n").unwrap();

        let ledger = FailureLedger::open(&path);
        assert_eq!(ledger.load(), vec!["u1", "u2"]);
        assert_eq!(ledger.flush().unwrap(), 2);
        assert_eq!(read_table(&path).unwrap().num_rows(), 2);
        assert_eq!(read_ids(&path).unwrap(), vec!["u1", "u2"]);
    }

    #[test]
    fn unreadable_ledger_is_replaced_on_flush() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("failed_urls.csv");
        std::fs::write(&path, "").unwrap();

        let mut ledger = FailureLedger::open(&path);
        assert!(ledger.load().is_empty());
        ledger.record("u1");
        assert_eq!(ledger.flush().unwrap(), 1);
        assert_eq!(ledger.load(), vec!["u1"]);
    }

    #[test]
    fn forget_prunes_only_named_entries() {
        let tmp = TempDir::new().unwrap();
        let mut ledger = ledger(&tmp);
        for id in ["a", "b", "c"] {
            ledger.record(id);
        }
        ledger.flush().unwrap();
        ledger.clear();

        assert_eq!(ledger.forget(&["b", "zzz"]).unwrap(), 1);
        assert_eq!(ledger.load(), vec!["a", "c"]);
        assert_eq!(ledger.forget(&["zzz"]).unwrap(), 0);
    }
}

//! Record batch store: one collector's per-kind batch directories.
//!
//! Layout under a collector root:
//!
//! ```text
//! <root>/info/info_output_001_010.csv        chunk batches from a full run
//! <root>/info/updated_result_202501311200.csv  batch from an incremental run
//! <root>/info/merged_result.csv              canonical table (merge output)
//! <root>/relation/...
//! <root>/download_link/...
//! <root>/log/failed_urls.csv                 failure ledger
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone};
use lawharvest_core::EntityKind;
use tracing::{info, warn};

use crate::StoreError;
use crate::table::{TableFormat, read_table, write_table};

/// File stem of a kind's canonical table.
pub const CANONICAL_STEM: &str = "merged_result";

/// Bare stem reserved for update results; timestamped variants are batches.
pub const UPDATE_STEM: &str = "updated_result";

/// One batch file loaded as a text table.
#[derive(Debug, Clone)]
pub struct LoadedBatch {
    pub path: PathBuf,
    pub table: RecordBatch,
}

/// Result of scanning a kind directory for batches.
#[derive(Debug)]
pub enum BatchScan {
    /// No batch files exist for this kind.
    Empty,
    /// Batch files exist. `skipped` lists files that could not be read.
    Loaded {
        batches: Vec<LoadedBatch>,
        skipped: Vec<PathBuf>,
    },
}

impl BatchScan {
    pub fn batches(&self) -> &[LoadedBatch] {
        match self {
            BatchScan::Empty => &[],
            BatchScan::Loaded { batches, .. } => batches,
        }
    }
}

/// Batch storage for one collector output root.
#[derive(Debug, Clone)]
pub struct BatchStore {
    root: PathBuf,
    format: TableFormat,
}

impl BatchStore {
    pub fn new(root: impl Into<PathBuf>, format: TableFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of the canonical table for `kind`.
    pub fn canonical_path(&self, kind: EntityKind) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{CANONICAL_STEM}.{}", self.format.extension()))
    }

    /// Path of the persisted failure ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("log").join("failed_urls.csv")
    }

    /// Batch files for `kind`, oldest first.
    ///
    /// Canonical results and the bare update-result name are never inputs.
    /// Files with equal modification times are ordered by name.
    pub fn batch_files(&self, kind: EntityKind) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.kind_dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || TableFormat::from_path(&path).is_none() || is_result_file(&path)
            {
                continue;
            }
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push((modified, path));
        }
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Load every batch for `kind`.
    ///
    /// A batch that cannot be read is logged and skipped; it never aborts
    /// the scan.
    pub fn scan(&self, kind: EntityKind) -> Result<BatchScan, StoreError> {
        let files = self.batch_files(kind)?;
        if files.is_empty() {
            info!(dir = %self.kind_dir(kind).display(), "no batch files");
            return Ok(BatchScan::Empty);
        }

        let mut batches = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();
        for path in files {
            match read_table(&path) {
                Ok(table) => batches.push(LoadedBatch { path, table }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable batch");
                    skipped.push(path);
                }
            }
        }
        info!(
            kind = %kind,
            loaded = batches.len(),
            skipped = skipped.len(),
            "scanned batches"
        );
        Ok(BatchScan::Loaded { batches, skipped })
    }

    /// Persist one batch under `stem` (extension from the store format).
    pub fn write_batch(
        &self,
        kind: EntityKind,
        stem: &str,
        batch: &RecordBatch,
    ) -> Result<PathBuf, StoreError> {
        let path = self
            .kind_dir(kind)
            .join(format!("{stem}.{}", self.format.extension()));
        write_table(&path, batch)?;
        info!(rows = batch.num_rows(), path = %path.display(), "saved batch");
        Ok(path)
    }

    /// `stem`, or `stem_2`, `stem_3`, ... if a batch with that stem already exists.
    pub fn unused_stem(&self, kind: EntityKind, stem: &str) -> String {
        let dir = self.kind_dir(kind);
        let taken = |s: &str| dir.join(format!("{s}.{}", self.format.extension())).exists();
        if !taken(stem) {
            return stem.to_string();
        }
        (2..)
            .map(|n| format!("{stem}_{n}"))
            .find(|s| !taken(s))
            .unwrap_or_else(|| stem.to_string())
    }

    /// Replace the canonical table for `kind`.
    pub fn write_canonical(
        &self,
        kind: EntityKind,
        batch: &RecordBatch,
    ) -> Result<PathBuf, StoreError> {
        let path = self.canonical_path(kind);
        write_table(&path, batch)?;
        Ok(path)
    }

    /// The canonical table for `kind`, or `None` if it was never written.
    pub fn read_canonical(&self, kind: EntityKind) -> Result<Option<RecordBatch>, StoreError> {
        let path = self.canonical_path(kind);
        if !path.exists() {
            return Ok(None);
        }
        read_table(&path).map(Some)
    }
}

fn is_result_file(path: &Path) -> bool {
    matches!(
        path.file_stem().and_then(|s| s.to_str()),
        Some(CANONICAL_STEM | UPDATE_STEM)
    )
}

/// Stem of a chunk batch covering listing pages `start..=end`.
pub fn chunk_stem(prefix: &str, kind: EntityKind, start: usize, end: usize) -> String {
    format!("{prefix}{}_output_{start:03}_{end:03}", kind.chunk_stem())
}

/// Stem of an incremental-run batch.
pub fn update_stem<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{UPDATE_STEM}_{}", at.format("%Y%m%d%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, StringArray};
    use chrono::Utc;
    use lawharvest_core::text_schema;
    use tempfile::TempDir;

    fn batch(items: &[&str]) -> RecordBatch {
        let array: StringArray = items.iter().map(|s| Some(*s)).collect();
        RecordBatch::try_new(
            Arc::new(text_schema(&["itemID"])),
            vec![Arc::new(array) as ArrayRef],
        )
        .unwrap()
    }

    #[test]
    fn missing_directory_scans_empty() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::new(tmp.path(), TableFormat::Csv);
        assert!(matches!(
            store.scan(EntityKind::LawInfo).unwrap(),
            BatchScan::Empty
        ));
    }

    #[test]
    fn results_are_not_inputs() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::new(tmp.path(), TableFormat::Csv);
        store.write_batch(EntityKind::LawInfo, "info_output_001_010", &batch(&["1"])).unwrap();
        store.write_batch(EntityKind::LawInfo, "updated_result_202501010000", &batch(&["2"])).unwrap();
        store.write_batch(EntityKind::LawInfo, UPDATE_STEM, &batch(&["3"])).unwrap();
        store.write_canonical(EntityKind::LawInfo, &batch(&["4"])).unwrap();
        fs::write(store.kind_dir(EntityKind::LawInfo).join("notes.txt"), "x").unwrap();

        let names: Vec<String> = store
            .batch_files(EntityKind::LawInfo)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"info_output_001_010.csv".to_string()));
        assert!(names.contains(&"updated_result_202501010000.csv".to_string()));
    }

    #[test]
    fn unreadable_batch_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::new(tmp.path(), TableFormat::Csv);
        store.write_batch(EntityKind::Relation, "relations_output_001_010", &batch(&["1", "2"])).unwrap();
        let dir = store.kind_dir(EntityKind::Relation);
        fs::write(dir.join("relations_output_011_020.csv"), "").unwrap();
        fs::write(dir.join("broken.parquet"), "not parquet").unwrap();

        match store.scan(EntityKind::Relation).unwrap() {
            BatchScan::Loaded { batches, skipped } => {
                assert_eq!(batches.len(), 1);
                assert_eq!(batches[0].table.num_rows(), 2);
                assert_eq!(skipped.len(), 2);
            }
            BatchScan::Empty => panic!("expected loaded batches"),
        }
    }

    #[test]
    fn canonical_roundtrip_replaces() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::new(tmp.path(), TableFormat::Parquet);
        assert!(store.read_canonical(EntityKind::DownloadLink).unwrap().is_none());
        store.write_canonical(EntityKind::DownloadLink, &batch(&["1", "2", "3"])).unwrap();
        store.write_canonical(EntityKind::DownloadLink, &batch(&["9"])).unwrap();
        let read = store.read_canonical(EntityKind::DownloadLink).unwrap().unwrap();
        assert_eq!(read.num_rows(), 1);
        assert!(store.canonical_path(EntityKind::DownloadLink).ends_with("download_link/merged_result.parquet"));
    }

    #[test]
    fn unused_stem_avoids_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = BatchStore::new(tmp.path(), TableFormat::Csv);
        let kind = EntityKind::LawInfo;
        let stem = "updated_result_202501010000";
        assert_eq!(store.unused_stem(kind, stem), stem);
        store.write_batch(kind, stem, &batch(&["1"])).unwrap();
        assert_eq!(store.unused_stem(kind, stem), "updated_result_202501010000_2");
        store.write_batch(kind, "updated_result_202501010000_2", &batch(&["2"])).unwrap();
        assert_eq!(store.unused_stem(kind, stem), "updated_result_202501010000_3");
    }

    #[test]
    fn batch_file_names() {
        assert_eq!(
            chunk_stem("danang_", EntityKind::Relation, 1, 10),
            "danang_relations_output_001_010"
        );
        assert_eq!(chunk_stem("", EntityKind::LawInfo, 11, 12), "info_output_011_012");
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 9, 5, 0).unwrap();
        assert_eq!(update_stem(&at), "updated_result_202501310905");
    }
}

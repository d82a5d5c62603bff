//! Harvest configuration and output directory layout.

use std::path::{Path, PathBuf};

use lawharvest_core::Mode;
use serde::{Deserialize, Serialize};

use crate::StoreError;
use crate::batch::BatchStore;
use crate::table::TableFormat;

/// Retry timing for collector operations, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_secs: u64,
    /// Wait inserted before the last attempt to ride out rate limiting.
    pub long_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay_secs: 60,
            long_delay_secs: 1800,
        }
    }
}

/// Settings for a harvest run, loaded from JSON.
///
/// Every field has a default, so an empty object (or no file at all) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Directory all collector and combined outputs live under.
    pub root: PathBuf,
    pub central_dir: String,
    pub local_dir: String,
    pub directive_dir: String,
    pub combined_dir: String,
    pub format: TableFormat,
    /// Listing pages scanned for new documents on an incremental run.
    pub update_pages: usize,
    pub retry: RetrySettings,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
            central_dir: "central_law".into(),
            local_dir: "local_law".into(),
            directive_dir: "directive".into(),
            combined_dir: "law_combined".into(),
            format: TableFormat::Csv,
            update_pages: 20,
            retry: RetrySettings::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout {
            root: self.root.clone(),
            central: self.central_dir.clone(),
            local: self.local_dir.clone(),
            directive: self.directive_dir.clone(),
            combined: self.combined_dir.clone(),
            format: self.format,
        }
    }
}

/// Where each collector's batches and the combined outputs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    central: String,
    local: String,
    directive: String,
    combined: String,
    format: TableFormat,
}

impl OutputLayout {
    pub fn format(&self) -> TableFormat {
        self.format
    }

    /// Output root of one collector.
    pub fn collector_root(&self, mode: Mode) -> PathBuf {
        let dir = match mode {
            Mode::Central => &self.central,
            Mode::Local => &self.local,
            Mode::Directive => &self.directive,
        };
        self.root.join(dir)
    }

    /// Batch store of one collector.
    pub fn store(&self, mode: Mode) -> BatchStore {
        BatchStore::new(self.collector_root(mode), self.format)
    }

    /// Root of the cross-collector outputs.
    pub fn combined_root(&self) -> PathBuf {
        self.root.join(&self.combined)
    }

    /// Path of a combined output, e.g. `combined_path("info", "law_info")`.
    pub fn combined_path(&self, dir: &str, stem: &str) -> PathBuf {
        self.combined_root()
            .join(dir)
            .join(format!("{stem}.{}", self.format.extension()))
    }
}

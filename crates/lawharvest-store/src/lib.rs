//! Storage layer: batch directories, canonical tables and CSV/Parquet table I/O.

pub mod batch;
pub mod config;
mod error;
pub mod table;

pub use batch::{BatchScan, BatchStore, LoadedBatch, chunk_stem, update_stem};
pub use config::{HarvestConfig, OutputLayout, RetrySettings};
pub use error::StoreError;
pub use table::{TableFormat, cell, concat_text, read_table, text_column, to_text, write_table};

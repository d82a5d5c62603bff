use lawharvest_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

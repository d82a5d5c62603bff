use lawharvest_merge::MergeError;
use lawharvest_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

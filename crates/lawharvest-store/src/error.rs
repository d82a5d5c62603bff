use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("table file is empty: {0}")]
    EmptyFile(std::path::PathBuf),

    #[error("unsupported table format: {0}")]
    UnsupportedFormat(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

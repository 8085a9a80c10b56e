use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Mapping parse error in {} line {line}: {reason} ('{content}')", file.display())]
    MappingParse {
        file: PathBuf,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Schema mismatch for {dataset}: missing columns {missing:?}")]
    SchemaMismatch {
        dataset: String,
        missing: Vec<String>,
    },

    #[error("Quality check failed for {description} ({table}): {reason}")]
    DataValidation {
        table: String,
        description: String,
        reason: String,
    },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Stage dependency cycle involving: {0}")]
    StageCycle(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

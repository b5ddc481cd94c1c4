use thiserror::Error;

use crate::storage::csv::CsvError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Statement rejected: {0}")]
    RejectedStatement(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

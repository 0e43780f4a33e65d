use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("invalid {column} value '{value}' in {table} table")]
    InvalidValue {
        table: String,
        column: String,
        value: String,
    },

    #[error("invalid brand catalog: {0}")]
    InvalidCatalog(String),

    #[error("worker count must be at least 1, got {0}")]
    InvalidWorkerCount(usize),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        TallyError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;

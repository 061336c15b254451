//! Error types for the folio backend

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(i64),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Type mismatch for field: {0}")]
    TypeMismatch(String),

    /// An intermediate segment of a JSON path already holds a scalar value,
    /// so the path cannot be created. Indicates malformed stored data.
    #[error("key \"{path}\" does not hold a nested object")]
    StructuralConflict { path: String },

    #[error("Search error: {0}")]
    Search(String),

    #[error("Job queue error: {0}")]
    JobQueue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

use std::path::PathBuf;

use pacer_core::ScopeError;
use pacer_store::StoreError;
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A whole batch failed to assemble. The build stops here: dropping the
    /// batch silently would leave the index with a hole in it.
    #[error("malformed batch {batch}: {source}")]
    MalformedBatch {
        batch: usize,
        source: arrow::error::ArrowError,
    },

    #[error("PACER_DIR is not configured")]
    MissingPacerDir,

    #[error("column '{column}' missing or mistyped in {table}")]
    Column { table: &'static str, column: String },

    #[error("invalid project file {path}: {source}")]
    ProjectFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

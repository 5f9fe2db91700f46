//! Error types for document uploads.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while uploading documents.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid scan window: minimum {min_ms}ms exceeds maximum {max_ms}ms")]
    InvalidScanWindow { min_ms: u64, max_ms: u64 },
}

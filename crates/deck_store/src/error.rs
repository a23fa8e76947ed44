//! Error types for presentation package operations

use deck_merge::MergeError;
use thiserror::Error;

/// Errors that can occur while reading, parsing or rendering a package
#[derive(Debug, Error)]
pub enum StoreError {
    /// Input bytes are not a readable zip container
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    /// ZIP error on an otherwise opened container
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML parsing error in {part}: {message}")]
    Xml { part: String, message: String },

    /// Part text is not valid UTF-8
    #[error("Part {part} is not valid UTF-8")]
    Utf8 { part: String },

    /// Package or part exceeds a size limit
    #[error("{what} is {size} bytes, limit is {limit}")]
    TooLarge { what: String, size: u64, limit: u64 },

    /// Relationship part is malformed
    #[error("Relationship error: {0}")]
    Relationship(String),

    /// Template merge failed
    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl StoreError {
    pub fn xml(part: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StoreError::Xml { part: part.into(), message: err.to_string() }
    }
}

/// Result type for package operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

//! Error types for homelib core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using LibraryError
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Top-level error type for all homelib operations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The archive itself cannot be read. Fatal to an import.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid archive: {0} not found")]
    MissingManifest(String),

    #[error("Invalid manifest: 'books' array not found")]
    MissingRecords,

    #[error("Malformed manifest: {0}")]
    Malformed(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
}

/// Errors raised by a record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Book not found: {0}")]
    NotFound(i64),

    #[error("Invalid book: {0}")]
    Invalid(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A cover image could not be found or moved
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Unsafe asset reference: {0}")]
    UnsafeReference(String),

    #[error("Failed to copy asset {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single record failed to parse or persist. Never aborts a batch.
#[derive(Debug, Clone, Error)]
#[error("Failed to import book '{}': {message}", .title.as_deref().unwrap_or("unknown"))]
pub struct RecordError {
    pub title: Option<String>,
    pub message: String,
}

impl RecordError {
    pub fn new(title: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            title: title.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Errors that occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_message() {
        let err = RecordError::new(Some("Dune"), "disk full");
        assert_eq!(err.to_string(), "Failed to import book 'Dune': disk full");

        let err = RecordError::new(None, "missing title");
        assert_eq!(
            err.to_string(),
            "Failed to import book 'unknown': missing title"
        );
    }
}

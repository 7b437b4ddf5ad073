// src/error.rs

use thiserror::Error;

/// Core error types for yumrepo
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O errors with path context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Initialization error (client, cache directory, configuration)
    #[error("Failed to initialize: {0}")]
    InitError(String),

    /// Catalog database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Network or file fetch failure
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Malformed XML, flags, epoch or repository index
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Malformed compressed stream
    #[error("Decompression error: {0}")]
    DecompressError(String),

    /// Relational catalog lacks a required table or column
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Backend queried before its catalog was loaded
    #[error("Catalog not loaded: {0}")]
    NotLoaded(String),

    /// No backend registered under the requested kind
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Downloaded artifact does not match the repository index
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// No package with the requested name and version
    #[error("no such package name={name:?} version={version:?} release={release:?}")]
    NoSuchPackage {
        name: String,
        version: String,
        release: String,
    },

    /// No package provides the requested capability
    #[error("no package providing name={name:?} version={version:?} release={release:?}")]
    NoProvider {
        name: String,
        version: String,
        release: String,
    },

    /// Generic lookup miss
    #[error("Not found: {0}")]
    NotFoundError(String),
}

impl Error {
    /// True for lookup misses, which multi-repository callers may skip
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoSuchPackage { .. } | Error::NoProvider { .. } | Error::NotFoundError(_)
        )
    }
}

/// Result type alias using yumrepo's Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let miss = Error::NoSuchPackage {
            name: "doesnotexist".to_string(),
            version: String::new(),
            release: String::new(),
        };
        assert!(miss.is_not_found());
        assert!(miss.to_string().contains("\"doesnotexist\""));

        let io = Error::IoError("disk full".to_string());
        assert!(!io.is_not_found());
    }
}

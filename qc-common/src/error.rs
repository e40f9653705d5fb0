//! Common error types for the QC index

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for QC index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the store layer and configuration loading
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML document could not be parsed
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// `initialize` was requested on a database that already holds an index
    #[error("Database already initialized: {0}")]
    AlreadyInitialized(PathBuf),

    /// An index operation was requested on a database without the QC tables
    #[error("Database not initialized: {0}")]
    NotInitialized(PathBuf),
}

//! Error types for the I/O and configuration collaborators
//!
//! The optimizing core itself cannot fail; only reading, writing and
//! loading configuration can.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Optimizer error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from a reader or writer
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for the config schema
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config value out of range
    #[error("Invalid config value for '{field}': {message}")]
    Config { field: String, message: String },

    /// JSON encoding error (stats and event dumps)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for optimizer operations
pub type Result<T> = std::result::Result<T, Error>;

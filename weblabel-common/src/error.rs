//! Common error types for weblabel

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for weblabel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the label store and its supporting modules
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier is not part of the discovered index
    #[error("Unknown file identifier: {0}")]
    UnknownIdentifier(String),

    /// An auxiliary vector file recorded or expected for a file is absent
    #[error("Missing auxiliary data for {id}: {}", path.display())]
    MissingAuxiliaryData { id: String, path: PathBuf },

    /// Reading or writing a persisted JSON document failed (other than absence)
    #[error("Config I/O error on {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted JSON document does not have the expected shape
    #[error("Malformed config {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    /// Sample or auxiliary file is not a supported NPY array
    #[error("Cannot decode {}: {reason}", path.display())]
    SampleDecode { path: PathBuf, reason: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True when the error means the requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::UnknownIdentifier(_) | Error::MissingAuxiliaryData { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

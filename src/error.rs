//! Error types for docport.

use std::io;
use thiserror::Error;

/// Result type alias for docport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while importing or exporting documents.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source could not be read or is corrupt.
    #[error("Could not read source: {0}")]
    ReadFailure(String),

    /// The file extension is not recognized.
    ///
    /// Import degrades to plain text instead of returning this; it only
    /// surfaces from strict lookups such as [`crate::ImporterRegistry::require`].
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An extractor declined the input. Callers try the generic fallback.
    #[error("Extraction declined: {0}")]
    Declined(String),

    /// A malformed escape sequence could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An unexpected fault inside an extractor.
    #[error("Unexpected extraction failure: {0}")]
    Catastrophic(String),

    /// Error while producing an export payload.
    #[error("Export error: {0}")]
    Export(String),

    /// Error while rendering (JSON, PDF layout).
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check whether this error is an ordinary decline rather than a fault.
    pub fn is_declined(&self) -> bool {
        matches!(self, Error::Declined(_))
    }

    /// Create a decline with the given reason.
    pub fn declined(reason: impl Into<String>) -> Self {
        Error::Declined(reason.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Render(format!("JSON serialization error: {}", err))
    }
}

//! Error types for rolling writers.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for writer operations.
pub type WriterResult<T> = Result<T, WriterError>;

/// Errors that can occur while constructing or using a rolling writer.
#[derive(Debug, Error)]
pub enum WriterError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configuration is missing a required field or holds an invalid value.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A JSON configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The writer has already been closed.
    #[error("writer is closed")]
    Closed,

    /// Compressing a rotated file failed.
    #[error("failed to compress {path}: {source}")]
    Compression {
        /// The compressed file that was being produced.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl WriterError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a closed writer.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<WriterError> for io::Error {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::Io(inner) => inner,
            WriterError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            WriterError::InvalidConfig { .. } | WriterError::ConfigParse(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

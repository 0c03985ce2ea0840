//! Error types for the rendering engine.

use thiserror::Error;

/// Errors raised by operations that touch collaborators (stores, storage, config).
///
/// The decision functions themselves never fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Persistence collaborator failed (device/plugin rows)
    #[error("Store error: {0}")]
    Store(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

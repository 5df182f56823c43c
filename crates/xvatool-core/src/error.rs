//! Error types for the xvatool core library.

use std::path::PathBuf;

/// The main error type for xvatool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// Malformed archive content (bad entry names, truncated blocks).
    #[error("archive error: {message}")]
    Archive { message: String },

    /// Checksum mismatch while strict verification is enabled.
    #[error("checksum error: {message}")]
    Checksum { message: String },

    /// Error generating a VMDK descriptor.
    #[error("descriptor error: {message}")]
    Descriptor { message: String },
}

/// A specialized Result type for xvatool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Create a checksum error.
    pub fn checksum(message: impl Into<String>) -> Self {
        Self::Checksum {
            message: message.into(),
        }
    }

    /// Create a descriptor error.
    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

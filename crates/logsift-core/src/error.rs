//! Error types for logsift.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Result type alias for logsift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across logsift crates.
///
/// Index-engine errors are mapped to [`Error::Operation`] at the call site so
/// that this crate stays free of engine dependencies.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A caller-supplied argument was rejected before any I/O happened.
    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument {
        /// Name of the offending argument
        name: String,
        /// What is wrong with it
        message: String,
    },

    /// Filesystem failure, with the offending path when known.
    #[error("I/O error{}: {source}", path_suffix(.path))]
    Io {
        /// Path being accessed
        path: Option<PathBuf>,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The underlying index store could not open, query or commit.
    #[error("Index operation failed: {message}")]
    Operation {
        /// Human-readable description
        message: String,
    },

    /// A bounded index call or writer wait expired.
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// Configured bound in milliseconds
        millis: u64,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// Stored JSON payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default()
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { path: None, source }
    }
}

impl Error {
    /// Returns whether retrying the same call may succeed.
    ///
    /// Store failures and timeouts are transient; argument, configuration
    /// and serialization problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io { .. } => true,
            Error::Operation { .. } => true,
            Error::Timeout { .. } => true,
            Error::InvalidArgument { .. } => false,
            Error::Config { .. } => false,
            Error::Serialization(_) => false,
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument<N, M>(name: N, message: M) -> Self
    where
        N: Into<String>,
        M: Into<String>,
    {
        Error::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error tagged with the path being accessed.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: Some(path.as_ref().to_path_buf()),
            source,
        }
    }

    /// Creates an index operation error.
    pub fn operation<S: Into<String>>(message: S) -> Self {
        Error::Operation {
            message: message.into(),
        }
    }

    /// Creates a timeout error for the given operation.
    pub fn timeout<S: Into<String>>(operation: S, after: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            millis: after.as_millis() as u64,
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

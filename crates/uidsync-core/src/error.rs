//! Reconciliation error types
//!
//! A query miss is never an error here: oracles answer `Ok(false)` or
//! `Ok(None)`. Only conditions that must stop the run surface as
//! [`CoreError`].

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the reconciliation engine.
pub type CoreResult<T> = Result<T, CoreError>;

/// Error that stops a reconciliation run.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An entry precondition does not hold (privilege, missing input).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The desired-state file could not be opened or read.
    #[error("cannot read desired-state file {path}: {message}")]
    MappingUnreadable { path: PathBuf, message: String },

    /// An external command exited with a non-zero status.
    #[error("command failed with status {code}: {command}")]
    CommandFailed {
        /// Shell-quoted command line, for display only.
        command: String,
        /// Exit status to propagate as the process status.
        code: i32,
        /// Captured standard error, surfaced verbatim.
        stderr: String,
    },

    /// A local file-system operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend does not implement the requested capability.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported { backend: String, operation: String },

    /// A name or value cannot be passed safely to a backend.
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: String },

    /// Reading an operator answer failed.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Configuration is inconsistent or incomplete.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The account database returned an error other than "not found".
    #[error("account database lookup failed: {0}")]
    Lookup(String),
}

impl CoreError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an [`CoreError::Unsupported`] error.
    pub fn unsupported(backend: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    pub fn invalid_identifier(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error.
    ///
    /// A failed external command propagates its own status so callers
    /// wrapping this tool see what the underlying tool reported.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::CommandFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

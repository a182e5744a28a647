//! Error types for fast-start operations
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Error types for fast-start operations
#[derive(Debug, Error)]
pub enum FastStartError {
    /// IO error (input open, indexing, moov read, output write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Container structure error (missing required atom, malformed box)
    #[error("Format error: {0}")]
    Format(String),
}

impl FastStartError {
    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

/// Result type alias for fast-start operations
pub type FastStartResult<T> = Result<T, FastStartError>;

//! Unified error types for chatloom.
//!
//! This module provides a single [`ChatloomError`] enum that covers all error
//! cases in the library. Export text is hand-produced by end users and is
//! treated as adversarial: most malformed input degrades to a partial result
//! rather than surfacing here. The variants that remain are the genuinely
//! unrecoverable ones.

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for chatloom operations.
///
/// # Example
///
/// ```rust
/// use chatloom::error::Result;
/// use chatloom::Message;
///
/// fn my_function() -> Result<Vec<Message>> {
///     // ... operations that may fail
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, ChatloomError>;

/// The error type for all chatloom operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatloomError {
    /// An I/O error occurred while reading an export or attachment.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The overall parse of a source failed structurally.
    ///
    /// Line-level failures never produce this; they are logged and skipped.
    /// This variant covers unexpected data shapes that prevent producing any
    /// messages at all. Callers usually degrade it to an empty chat carrying
    /// the message as metadata, see [`Chat::failed`](crate::chat::Chat::failed).
    #[error("Failed to parse export '{source_name}': {message}")]
    Parse {
        /// Name of the export source being parsed
        source_name: String,
        /// Description of what went wrong
        message: String,
    },

    /// A remote media fetch failed.
    ///
    /// Propagated out of the media cache untouched; the cache makes no entry
    /// on failure and callers decide whether to retry.
    #[error("Failed to fetch media '{remote_id}': {message}")]
    Fetch {
        /// Opaque remote identifier of the attachment
        remote_id: String,
        /// Description from the fetch collaborator
        message: String,
    },

    /// JSON serialization error (CLI output).
    #[cfg(feature = "json-output")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ChatloomError {
    /// Creates a structural parse error for a named source.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        ChatloomError::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a media fetch error.
    pub fn fetch(remote_id: impl Into<String>, message: impl Into<String>) -> Self {
        ChatloomError::Fetch {
            remote_id: remote_id.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ChatloomError::InvalidConfig(message.into())
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ChatloomError::Io(_))
    }

    /// Returns `true` if this is a structural parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, ChatloomError::Parse { .. })
    }

    /// Returns `true` if this is a media fetch error.
    pub fn is_fetch(&self) -> bool {
        matches!(self, ChatloomError::Fetch { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

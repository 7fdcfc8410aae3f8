//! Error types for storage operations.
//!
//! Store errors are local to one entry. Callers log them and carry on;
//! a damaged entry never makes the rest of a folder unreadable.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No entry with this id.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Writing an entry failed.
    #[error("Failed to write {key}: {reason}")]
    WriteFailed {
        /// Storage key of the entry.
        key: String,
        /// Underlying cause.
        reason: String,
    },

    /// Renaming an entry (state change or commit) failed.
    #[error("Failed to rename {from} to {to}: {reason}")]
    RenameFailed {
        /// Old storage key.
        from: String,
        /// New storage key.
        to: String,
        /// Underlying cause.
        reason: String,
    },

    /// Removing an entry failed.
    #[error("Failed to delete {key}: {reason}")]
    DeleteFailed {
        /// Storage key of the entry.
        key: String,
        /// Underlying cause.
        reason: String,
    },

    /// A storage key does not follow the `{N|O}_{id}{extension}` layout.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Stored bytes could not be parsed.
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for repository operations.

use itemkv_types::{ItemId, TypeError};
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No item is stored under this identifier.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// The draft failed validation.
    #[error("invalid item: {0}")]
    Invalid(#[from] TypeError),

    /// The store failed. Passed through unchanged.
    #[error("store error: {0}")]
    Store(#[from] itemkv_store::StoreError),

    /// A stored record could not be decoded.
    #[error("corrupt record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// An item could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

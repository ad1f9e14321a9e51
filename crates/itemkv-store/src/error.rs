/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A value operation hit a set key, or a set operation hit a value key.
    #[error("wrong kind of value held at key {key}")]
    WrongType { key: String },

    /// The backend could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Connection-level I/O failure talking to a networked backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

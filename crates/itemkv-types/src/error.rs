use thiserror::Error;

/// Errors produced while building or validating items.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("type is required")]
    EmptyType,

    #[error("data is required")]
    MissingData,

    #[error("tags must not be empty strings")]
    EmptyTag,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

pub type TypeResult<T> = Result<T, TypeError>;

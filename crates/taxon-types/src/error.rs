use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid category key: {0}")]
    InvalidKey(String),

    #[error("invalid page request: {0}")]
    InvalidPage(String),
}

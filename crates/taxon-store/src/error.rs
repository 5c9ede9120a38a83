use taxon_types::{CategoryId, PostId};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another category already holds this `(name, parent)` pair.
    #[error("unique constraint violated: category {name:?} under {parent:?}")]
    UniqueViolation {
        name: String,
        parent: Option<CategoryId>,
    },

    /// A write referenced a category that does not exist.
    #[error("category {0} does not exist")]
    MissingCategory(CategoryId),

    /// A write referenced a post that does not exist.
    #[error("post {0} does not exist")]
    MissingPost(PostId),

    /// Snapshot data is internally inconsistent.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

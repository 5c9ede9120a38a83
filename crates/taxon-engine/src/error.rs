//! Error types for the consistency engine.
//!
//! Every failure carries a machine-checkable [`ErrorKind`] and a readable
//! message. All checks that can fail run before the first store write, so a
//! rejected operation never leaves partial state behind.

use std::fmt;

use taxon_store::StoreError;

/// Coarse classification of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing or malformed.
    Validation,
    /// A referenced category, parent, or post does not exist.
    NotFound,
    /// The operation would break an invariant or changes nothing.
    Conflict,
    /// The persistence layer failed unexpectedly.
    Internal,
}

/// What kind of entity a lookup failed to find.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Missing {
    Category,
    ParentCategory,
    Post,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category => write!(f, "category"),
            Self::ParentCategory => write!(f, "parent category"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Why a mutation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conflict {
    /// The natural key is already taken by a persisted category.
    AlreadyExists,
    /// The update would not change any field.
    NoChanges,
    /// The category (or, when guarded, a sub-category) still has posts.
    HasPosts,
    /// A category with posts cannot become top-level.
    PromoteWithPosts,
    /// A category with sub-categories cannot be moved under a parent.
    NestWithChildren,
    /// A category cannot be moved under itself.
    SelfParent,
    /// Posts may not be attached to top-level categories.
    TopLevelPost,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AlreadyExists => "category already exists",
            Self::NoChanges => "no changes",
            Self::HasPosts => "not removable: has posts",
            Self::PromoteWithPosts => "cannot promote category with posts to top level",
            Self::NestWithChildren => "cannot nest category that has sub-categories",
            Self::SelfParent => "category cannot be its own parent",
            Self::TopLevelPost => "cannot attach post to top-level category",
        };
        f.write_str(msg)
    }
}

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(Missing),

    #[error("conflict: {0}")]
    Conflict(Conflict),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// The machine-checkable kind of this error.
    ///
    /// A unique-constraint violation raised by the store is a [`Conflict`]
    /// that slipped past the engine's fast-path check (a concurrent writer won
    /// the race), so it is reported as one.
    ///
    /// [`Conflict`]: ErrorKind::Conflict
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            Self::Internal(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// The conflict reason, if this is a conflict raised by the engine.
    pub fn conflict(&self) -> Option<Conflict> {
        match self {
            Self::Conflict(c) => Some(*c),
            Self::Store(StoreError::UniqueViolation { .. }) => Some(Conflict::AlreadyExists),
            _ => None,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

//! Natural-key resolution.
//!
//! Callers name categories by `(name, parent name)`, never by id. The
//! [`Resolver`] turns such a key into either the persisted category it names
//! or a transient [`NewCategory`] carrying the resolved parent id, so the
//! invariant checks downstream can tell creation from reuse by type.

use tracing::debug;

use taxon_store::CategoryStore;
use taxon_types::{Category, CategoryId, CategoryKey, NewCategory};

use crate::error::{Conflict, EngineError, EngineResult, Missing};

/// Outcome of resolving a [`CategoryKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The key names a persisted category.
    Existing(Category),
    /// No category has this key yet. The parent, if any, exists.
    New(NewCategory),
}

impl Resolution {
    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Existing(c) => &c.name,
            Self::New(c) => &c.name,
        }
    }

    pub fn parent(&self) -> Option<CategoryId> {
        match self {
            Self::Existing(c) => c.parent,
            Self::New(c) => c.parent,
        }
    }

    /// Require a persisted category.
    pub fn expect_existing(self) -> EngineResult<Category> {
        match self {
            Self::Existing(c) => Ok(c),
            Self::New(_) => Err(EngineError::NotFound(Missing::Category)),
        }
    }

    /// Require a key that is not taken yet.
    pub fn expect_new(self) -> EngineResult<NewCategory> {
        match self {
            Self::New(c) => Ok(c),
            Self::Existing(_) => Err(EngineError::Conflict(Conflict::AlreadyExists)),
        }
    }
}

/// Resolves natural keys against a category store.
pub struct Resolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: CategoryStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve `key`.
    ///
    /// A named parent is looked up among top-level categories first; if it is
    /// absent the whole resolution fails with `NotFound(ParentCategory)`.
    /// Resolution never writes.
    pub fn resolve(&self, key: &CategoryKey) -> EngineResult<Resolution> {
        let parent = match &key.parent {
            Some(parent_name) => Some(self.resolve_parent(parent_name)?.id),
            None => None,
        };

        let resolution = match self
            .store
            .find_category_by_name_and_parent(&key.name, parent)?
        {
            Some(existing) => Resolution::Existing(existing),
            None => Resolution::New(NewCategory::new(key.name.clone(), parent)),
        };
        debug!(key = %key, existing = resolution.is_existing(), "resolved category key");
        Ok(resolution)
    }

    /// Resolve `key` and require a persisted category.
    pub fn existing(&self, key: &CategoryKey) -> EngineResult<Category> {
        self.resolve(key)?.expect_existing()
    }

    /// Rebuild the natural key of a persisted category.
    pub fn key_of(&self, id: CategoryId) -> EngineResult<CategoryKey> {
        let category = self
            .store
            .find_category(id)?
            .ok_or(EngineError::NotFound(Missing::Category))?;
        let parent = match category.parent {
            Some(parent_id) => {
                let parent = self.store.find_category(parent_id)?.ok_or_else(|| {
                    EngineError::Internal(format!(
                        "category {} references missing parent {}",
                        category.id, parent_id
                    ))
                })?;
                Some(parent.name)
            }
            None => None,
        };
        Ok(CategoryKey::new(category.name, parent))
    }

    fn resolve_parent(&self, name: &str) -> EngineResult<Category> {
        self.store
            .find_category_by_name_and_parent(name, None)?
            .ok_or(EngineError::NotFound(Missing::ParentCategory))
    }
}

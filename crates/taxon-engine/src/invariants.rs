//! Tree invariant enforcement.
//!
//! The category tree is a forest of depth at most two. Every mutation passes
//! through a [`TreeGuard`] check before touching the store:
//!
//! 1. A create must resolve to a key that is not taken.
//! 2. An update must resolve to a key that is not taken, must not nest a
//!    category that has children, and must not promote a category that has
//!    posts.
//! 3. A delete is refused while the category (or, when configured, any of
//!    its sub-categories) has posts.
//! 4. A post attaches only to a persisted category, and by default only to a
//!    sub-category.
//!
//! Checks read the store but never write to it.

use tracing::debug;

use taxon_store::Store;
use taxon_types::{Category, CategoryId, CategoryKey, NewCategory};

use crate::config::EngineConfig;
use crate::error::{Conflict, EngineError, EngineResult};
use crate::resolve::Resolution;

/// Validates category tree mutations against the store.
pub struct TreeGuard<'a, S: ?Sized> {
    store: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: Store + ?Sized> TreeGuard<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// Accept a create only if the key is free.
    pub fn check_create(&self, after: Resolution) -> EngineResult<NewCategory> {
        let draft = after.expect_new().inspect_err(|e| {
            debug!(error = %e, "create rejected");
        })?;
        Ok(draft)
    }

    /// Accept moving or renaming `target` to the resolved `after` key.
    pub fn check_update(&self, target: &Category, after: Resolution) -> EngineResult<NewCategory> {
        let draft = after.expect_new()?;

        if draft.parent == Some(target.id) {
            return Err(self.reject(target, Conflict::SelfParent));
        }
        if draft.parent.is_some() && self.has_children(target.id)? {
            return Err(self.reject(target, Conflict::NestWithChildren));
        }
        if draft.parent.is_none()
            && !target.is_top_level()
            && self.store.count_posts_in_category(target.id)? > 0
        {
            return Err(self.reject(target, Conflict::PromoteWithPosts));
        }
        Ok(draft)
    }

    /// Accept deleting `target`.
    pub fn check_delete(&self, target: &Category) -> EngineResult<()> {
        if self.store.count_posts_in_category(target.id)? > 0 {
            return Err(self.reject(target, Conflict::HasPosts));
        }
        if self.config.guard_descendant_posts {
            for child in self.store.find_categories_by_parent(Some(target.id))? {
                if self.store.count_posts_in_category(child.id)? > 0 {
                    return Err(self.reject(target, Conflict::HasPosts));
                }
            }
        }
        Ok(())
    }

    /// Resolve the category a post will be attached to.
    ///
    /// `None` means the post names no category, which is allowed only when
    /// the configuration does not require one.
    pub fn check_attach(&self, category: Option<Resolution>) -> EngineResult<Option<CategoryId>> {
        let Some(resolution) = category else {
            if self.config.require_post_category {
                return Err(EngineError::validation("post category is required"));
            }
            return Ok(None);
        };
        let category = resolution.expect_existing()?;
        if self.config.forbid_top_level_posts && category.is_top_level() {
            return Err(self.reject(&category, Conflict::TopLevelPost));
        }
        Ok(Some(category.id))
    }

    fn has_children(&self, id: CategoryId) -> EngineResult<bool> {
        Ok(!self.store.find_categories_by_parent(Some(id))?.is_empty())
    }

    fn reject(&self, target: &Category, reason: Conflict) -> EngineError {
        debug!(category = %target.id, name = %target.name, %reason, "tree invariant violated");
        EngineError::Conflict(reason)
    }
}

/// Check a single category name.
pub fn validate_name(field: &str, name: &str, config: &EngineConfig) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::validation(format!("{field} must not be empty")));
    }
    if name.contains('/') {
        return Err(EngineError::validation(format!("{field} must not contain '/'")));
    }
    let len = name.chars().count();
    if len > config.max_name_len {
        return Err(EngineError::validation(format!(
            "{field} is {len} characters, limit is {}",
            config.max_name_len
        )));
    }
    Ok(())
}

/// Check both halves of a natural key.
pub fn validate_key(key: &CategoryKey, config: &EngineConfig) -> EngineResult<()> {
    validate_name("category name", &key.name, config)?;
    if let Some(parent) = &key.parent {
        validate_name("parent name", parent, config)?;
    }
    Ok(())
}

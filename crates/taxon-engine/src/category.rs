//! Category operations.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use taxon_store::Store;
use taxon_types::{Category, CategoryId, CategoryKey, CategoryPostCount};

use crate::change::{ensure_changed, CategoryUpdate};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, Missing};
use crate::invariants::{validate_key, validate_name, TreeGuard};
use crate::resolve::Resolver;
use crate::rollup::{aggregate, PostsCountTree};

/// Category lifecycle over a [`Store`].
///
/// Every mutation resolves natural keys, runs the tree checks, and only then
/// writes. A rejected call leaves the store untouched.
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
    config: EngineConfig,
}

impl CategoryService {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    fn resolver(&self) -> Resolver<'_, dyn Store> {
        Resolver::new(self.store.as_ref())
    }

    fn guard(&self) -> TreeGuard<'_, dyn Store> {
        TreeGuard::new(self.store.as_ref(), &self.config)
    }

    /// Create the category named by `key`.
    pub fn create(&self, key: &CategoryKey) -> EngineResult<Category> {
        validate_key(key, &self.config)?;
        let resolution = self.resolver().resolve(key)?;
        let draft = self.guard().check_create(resolution)?;
        let created = self.store.insert_category(draft)?;
        info!(id = %created.id, key = %key, "category created");
        Ok(created)
    }

    /// Look up the category named by `key`.
    pub fn get(&self, key: &CategoryKey) -> EngineResult<Category> {
        self.resolver().existing(key)
    }

    pub fn all(&self) -> EngineResult<Vec<Category>> {
        Ok(self.store.find_all_categories()?)
    }

    pub fn top_level(&self) -> EngineResult<Vec<Category>> {
        Ok(self.store.top_level_categories()?)
    }

    /// Sub-categories of the top-level category `parent`.
    pub fn sub_categories_of(&self, parent: &str) -> EngineResult<Vec<Category>> {
        let parent = self.resolver().existing(&CategoryKey::top(parent))?;
        Ok(self.store.find_categories_by_parent(Some(parent.id))?)
    }

    /// Natural key of a persisted category.
    pub fn key_of(&self, id: CategoryId) -> EngineResult<CategoryKey> {
        self.resolver().key_of(id)
    }

    /// Rename and/or move the category named by `before`.
    pub fn update(&self, before: &CategoryKey, update: &CategoryUpdate) -> EngineResult<Category> {
        validate_key(before, &self.config)?;
        if let Some(name) = &update.name {
            validate_name("category name", name, &self.config)?;
        }
        if let Some(parent) = &update.parent {
            validate_name("parent name", parent, &self.config)?;
        }
        ensure_changed(update.changes(before)).inspect_err(|_| {
            debug!(key = %before, "update rejected: no changes");
        })?;

        let resolver = self.resolver();
        let mut target = resolver.existing(before)?;
        let after = update.target_key(before);
        let draft = self.guard().check_update(&target, resolver.resolve(&after)?)?;

        target.apply(draft.name, draft.parent, Utc::now());
        self.store.update_category(&target)?;
        info!(id = %target.id, from = %before, to = %after, "category updated");
        Ok(target)
    }

    /// Delete the category named by `key` along with its sub-categories.
    pub fn delete(&self, key: &CategoryKey) -> EngineResult<()> {
        let target = self.resolver().existing(key)?;
        self.guard().check_delete(&target)?;
        if !self.store.delete_category(target.id)? {
            return Err(EngineError::NotFound(Missing::Category));
        }
        info!(id = %target.id, key = %key, "category deleted");
        Ok(())
    }

    /// Post counts rolled up into the category tree.
    ///
    /// `visible = Some(v)` counts only posts with that visibility.
    pub fn post_count_tree(&self, visible: Option<bool>) -> EngineResult<PostsCountTree> {
        let rows = self.store.categories_with_post_counts(visible)?;
        aggregate(&rows)
    }

    /// Flat post counts for categories that have posts.
    pub fn post_counts(&self, visible: Option<bool>) -> EngineResult<Vec<CategoryPostCount>> {
        Ok(self.store.count_posts_grouped_by_category(visible)?)
    }
}

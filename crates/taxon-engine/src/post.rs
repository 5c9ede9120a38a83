//! Post operations.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use taxon_store::{PostFilter, Store};
use taxon_types::{CategoryId, CategoryKey, NewPost, PageRequest, Post, PostId};

use crate::change::{ensure_changed, PostUpdate};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, Missing};
use crate::invariants::{validate_key, TreeGuard};
use crate::resolve::Resolver;

/// A post to be created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub category: Option<CategoryKey>,
    pub title: String,
    pub content: String,
    pub visible: bool,
}

/// Parameters for a post scan. Absent fields do not restrict the scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostQuery {
    pub visible: Option<bool>,
    /// Restrict to one category. A top-level category also matches the posts
    /// of its sub-categories.
    pub category: Option<CategoryKey>,
    /// 1-based page number. Defaults to the first page.
    pub page: Option<usize>,
    /// Page size. Defaults to the configured size.
    pub size: Option<usize>,
}

/// Post lifecycle over a [`Store`].
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Store>,
    config: EngineConfig,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    fn resolver(&self) -> Resolver<'_, dyn Store> {
        Resolver::new(self.store.as_ref())
    }

    fn guard(&self) -> TreeGuard<'_, dyn Store> {
        TreeGuard::new(self.store.as_ref(), &self.config)
    }

    /// Create a post, attaching it to the category its draft names.
    pub fn create(&self, draft: &PostDraft) -> EngineResult<Post> {
        validate_title(&draft.title)?;
        let category = self.attach(draft.category.as_ref())?;
        let post = self.store.insert_post(NewPost {
            category,
            title: draft.title.clone(),
            content: draft.content.clone(),
            visible: draft.visible,
        })?;
        info!(id = %post.id, category = ?draft.category, "post created");
        Ok(post)
    }

    /// Read a post and count the read.
    ///
    /// The counter is bumped inside the store, so concurrent reads and edits
    /// never overwrite each other.
    pub fn get(&self, id: PostId) -> EngineResult<Post> {
        let post = self
            .store
            .increment_hits(id)?
            .ok_or(EngineError::NotFound(Missing::Post))?;
        debug!(id = %id, hits = post.hits, "post read");
        Ok(post)
    }

    /// Read a post without counting the read.
    pub fn peek(&self, id: PostId) -> EngineResult<Post> {
        self.find(id)
    }

    /// One page of posts, newest first.
    pub fn list(&self, query: &PostQuery) -> EngineResult<Vec<Post>> {
        let page = self.page_request(query)?;
        let categories = match &query.category {
            Some(key) => {
                let category = self.resolver().existing(key)?;
                let mut ids = vec![category.id];
                if category.is_top_level() {
                    ids.extend(
                        self.store
                            .find_categories_by_parent(Some(category.id))?
                            .into_iter()
                            .map(|c| c.id),
                    );
                }
                Some(ids)
            }
            None => None,
        };
        let filter = PostFilter {
            visible: query.visible,
            categories,
        };
        Ok(self.store.find_posts(&filter, page)?)
    }

    /// Apply the present fields of `update` to post `id`.
    pub fn update(&self, id: PostId, update: &PostUpdate) -> EngineResult<Post> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        let mut post = self.find(id)?;
        let before_category = match post.category {
            Some(category) => Some(self.resolver().key_of(category)?),
            None => None,
        };
        ensure_changed(update.changes(&post, before_category.as_ref())).inspect_err(|_| {
            debug!(id = %id, "post update rejected: no changes");
        })?;

        if let Some(key) = &update.category {
            if Some(key) != before_category.as_ref() {
                post.category = self.attach(Some(key))?;
            }
        }
        if let Some(title) = &update.title {
            post.title = title.clone();
        }
        if let Some(content) = &update.content {
            post.content = content.clone();
        }
        if let Some(visible) = update.visible {
            post.visible = visible;
        }
        post.updated_at = Some(Utc::now());

        self.store.update_post(&post)?;
        info!(id = %id, "post updated");
        Ok(post)
    }

    pub fn delete(&self, id: PostId) -> EngineResult<()> {
        if !self.store.delete_post(id)? {
            return Err(EngineError::NotFound(Missing::Post));
        }
        info!(id = %id, "post deleted");
        Ok(())
    }

    fn find(&self, id: PostId) -> EngineResult<Post> {
        self.store
            .find_post(id)?
            .ok_or(EngineError::NotFound(Missing::Post))
    }

    fn attach(&self, key: Option<&CategoryKey>) -> EngineResult<Option<CategoryId>> {
        let resolution = match key {
            Some(key) => {
                validate_key(key, &self.config)?;
                Some(self.resolver().resolve(key)?)
            }
            None => None,
        };
        self.guard().check_attach(resolution)
    }

    fn page_request(&self, query: &PostQuery) -> EngineResult<PageRequest> {
        let size = query.size.unwrap_or(self.config.default_page_size);
        if size > self.config.max_page_size {
            return Err(EngineError::validation(format!(
                "page size {size} exceeds limit {}",
                self.config.max_page_size
            )));
        }
        PageRequest::new(query.page.unwrap_or(1), size)
            .map_err(|e| EngineError::validation(e.to_string()))
    }
}

fn validate_title(title: &str) -> EngineResult<()> {
    if title.trim().is_empty() {
        return Err(EngineError::validation("post title must not be empty"));
    }
    Ok(())
}

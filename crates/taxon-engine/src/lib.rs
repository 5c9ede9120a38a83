//! Consistency engine for the taxon category/post model.
//!
//! Categories form a forest of depth at most two, addressed by natural key
//! `(name, parent name)`. Posts attach to categories. This crate keeps the
//! two consistent:
//!
//! - [`Resolver`] turns natural keys into persisted or transient categories.
//! - [`TreeGuard`] rejects mutations that would break the tree shape or
//!   strand posts.
//! - [`CategoryUpdate`] / [`PostUpdate`] detect requests that change nothing.
//! - [`aggregate`] rolls flat per-category post counts into the tree.
//!
//! [`CategoryService`] and [`PostService`] wire these together over any
//! [`Store`]; [`Taxon`] bundles both for embedding.

pub mod category;
pub mod change;
pub mod config;
pub mod error;
pub mod invariants;
pub mod post;
pub mod resolve;
pub mod rollup;

use std::sync::Arc;

use taxon_store::{InMemoryStore, Store};

pub use category::CategoryService;
pub use change::{CategoryUpdate, PostUpdate};
pub use config::EngineConfig;
pub use error::{Conflict, EngineError, EngineResult, ErrorKind, Missing};
pub use invariants::TreeGuard;
pub use post::{PostDraft, PostQuery, PostService};
pub use resolve::{Resolution, Resolver};
pub use rollup::{aggregate, PostsCountModel, PostsCountTree};

pub use taxon_types::{Category, CategoryId, CategoryKey, Post, PostId};

/// Both services over one shared store.
#[derive(Clone)]
pub struct Taxon {
    categories: CategoryService,
    posts: PostService,
}

impl Taxon {
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            categories: CategoryService::new(store.clone(), config.clone()),
            posts: PostService::new(store, config),
        }
    }

    /// An engine over a fresh in-memory store with default rules.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), EngineConfig::default())
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }
}

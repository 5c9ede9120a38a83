//! In-memory store for tests, embedding, and the CLI.
//!
//! [`InMemoryStore`] keeps categories in an arena keyed by identity. Two
//! derived indexes sit beside it: a natural-key index enforcing the
//! `(name, parent)` unique constraint, and a parent index mapping each
//! category to its children. Both are maintained only by this module, so
//! entities never carry back-references.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use taxon_types::{
    Category, CategoryId, CategoryPostCount, NewCategory, NewPost, PageRequest, Post, PostId,
    PostsCountByCategory,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CategoryStore, PostFilter, PostStore};

type NaturalKey = (String, Option<CategoryId>);

/// Arena plus derived indexes. Everything behind one lock so each store call
/// sees and leaves a consistent state.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) categories: BTreeMap<CategoryId, Category>,
    pub(crate) posts: BTreeMap<PostId, Post>,
    pub(crate) last_category_id: u64,
    pub(crate) last_post_id: u64,
    natural: HashMap<NaturalKey, CategoryId>,
    children: HashMap<CategoryId, BTreeSet<CategoryId>>,
}

impl StoreState {
    /// Rebuild state (and both indexes) from raw entity lists.
    pub(crate) fn from_parts(
        categories: Vec<Category>,
        posts: Vec<Post>,
        last_category_id: u64,
        last_post_id: u64,
    ) -> StoreResult<Self> {
        let mut state = Self {
            last_category_id,
            last_post_id,
            ..Self::default()
        };

        for category in categories {
            if category.id.get() > last_category_id {
                return Err(StoreError::CorruptSnapshot(format!(
                    "category {} is beyond the id counter",
                    category.id
                )));
            }
            if state.categories.contains_key(&category.id) {
                return Err(StoreError::CorruptSnapshot(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
            state.categories.insert(category.id, category);
        }

        let all: Vec<Category> = state.categories.values().cloned().collect();
        for category in &all {
            if let Some(parent) = category.parent {
                if parent == category.id {
                    return Err(StoreError::CorruptSnapshot(format!(
                        "category {} is its own parent",
                        category.id
                    )));
                }
                match state.categories.get(&parent) {
                    None => {
                        return Err(StoreError::CorruptSnapshot(format!(
                            "category {} references missing parent {parent}",
                            category.id
                        )));
                    }
                    // Any parent cycle also lands here.
                    Some(grandparent) if grandparent.parent.is_some() => {
                        return Err(StoreError::CorruptSnapshot(format!(
                            "category {} is nested below sub-category {parent}",
                            category.id
                        )));
                    }
                    Some(_) => {}
                }
            }
            if state.natural.contains_key(&natural_key(category)) {
                return Err(StoreError::CorruptSnapshot(format!(
                    "duplicate natural key {:?} under {:?}",
                    category.name, category.parent
                )));
            }
            state.link(category);
        }

        for post in posts {
            if post.id.get() > last_post_id {
                return Err(StoreError::CorruptSnapshot(format!(
                    "post {} is beyond the id counter",
                    post.id
                )));
            }
            if let Some(category) = post.category {
                if !state.categories.contains_key(&category) {
                    return Err(StoreError::CorruptSnapshot(format!(
                        "post {} references missing category {category}",
                        post.id
                    )));
                }
            }
            state.posts.insert(post.id, post);
        }

        Ok(state)
    }

    fn link(&mut self, category: &Category) {
        self.natural.insert(natural_key(category), category.id);
        if let Some(parent) = category.parent {
            self.children.entry(parent).or_default().insert(category.id);
        }
    }

    fn unlink(&mut self, category: &Category) {
        self.natural.remove(&natural_key(category));
        if let Some(parent) = category.parent {
            if let Some(set) = self.children.get_mut(&parent) {
                set.remove(&category.id);
                if set.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
    }

    fn check_unique(
        &self,
        name: &str,
        parent: Option<CategoryId>,
        except: Option<CategoryId>,
    ) -> StoreResult<()> {
        match self.natural.get(&(name.to_string(), parent)) {
            Some(holder) if Some(*holder) != except => Err(StoreError::UniqueViolation {
                name: name.to_string(),
                parent,
            }),
            _ => Ok(()),
        }
    }

    fn check_category_exists(&self, id: CategoryId) -> StoreResult<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingCategory(id))
        }
    }

    /// `id` and every category below it, parents before children. Each
    /// category appears once even if the parent index holds a cycle.
    fn subtree(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut out = vec![id];
        let mut seen = BTreeSet::from([id]);
        let mut cursor = 0;
        while cursor < out.len() {
            if let Some(children) = self.children.get(&out[cursor]) {
                for child in children {
                    if seen.insert(*child) {
                        out.push(*child);
                    }
                }
            }
            cursor += 1;
        }
        out
    }
}

fn natural_key(category: &Category) -> NaturalKey {
    (category.name.clone(), category.parent)
}

/// In-memory, arena-backed implementation of [`CategoryStore`] and
/// [`PostStore`].
///
/// Data is lost when the store is dropped unless it is captured with
/// [`crate::Snapshot`].
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub(crate) fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Number of persisted categories.
    pub fn category_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.categories.len())
    }

    /// Number of persisted posts.
    pub fn post_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.posts.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InMemoryStore");
        if let Ok(state) = self.state.read() {
            s.field("categories", &state.categories.len())
                .field("posts", &state.posts.len());
        }
        s.finish()
    }
}

impl CategoryStore for InMemoryStore {
    fn find_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    fn find_category_by_name_and_parent(
        &self,
        name: &str,
        parent: Option<CategoryId>,
    ) -> StoreResult<Option<Category>> {
        let state = self.read()?;
        Ok(state
            .natural
            .get(&(name.to_string(), parent))
            .and_then(|id| state.categories.get(id))
            .cloned())
    }

    fn find_all_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    fn find_categories_by_parent(&self, parent: Option<CategoryId>) -> StoreResult<Vec<Category>> {
        let state = self.read()?;
        let found = match parent {
            Some(parent) => state
                .children
                .get(&parent)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| state.categories.get(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => state
                .categories
                .values()
                .filter(|c| c.is_top_level())
                .cloned()
                .collect(),
        };
        Ok(found)
    }

    fn categories_with_post_counts(
        &self,
        visible: Option<bool>,
    ) -> StoreResult<Vec<PostsCountByCategory>> {
        let state = self.read()?;

        let mut tallies: HashMap<CategoryId, (u64, u64)> = HashMap::new();
        for post in state.posts.values() {
            let Some(category) = post.category else {
                continue;
            };
            if visible.is_some_and(|v| v != post.visible) {
                continue;
            }
            let tally = tallies.entry(category).or_default();
            if post.visible {
                tally.0 += 1;
            } else {
                tally.1 += 1;
            }
        }

        // Parents first: top-level rows, then sub-category rows, each by id.
        let ordered = state
            .categories
            .values()
            .filter(|c| c.is_top_level())
            .chain(state.categories.values().filter(|c| !c.is_top_level()));

        let rows = ordered
            .map(|category| {
                let (visible, invisible) = tallies.get(&category.id).copied().unwrap_or_default();
                PostsCountByCategory {
                    parent_name: category
                        .parent
                        .and_then(|p| state.categories.get(&p))
                        .map(|p| p.name.clone()),
                    category: category.clone(),
                    visible,
                    invisible,
                }
            })
            .collect();
        Ok(rows)
    }

    fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut state = self.write()?;
        if let Some(parent) = category.parent {
            state.check_category_exists(parent)?;
        }
        state.check_unique(&category.name, category.parent, None)?;

        state.last_category_id += 1;
        let id = CategoryId::new(state.last_category_id);
        let persisted = category.into_persisted(id, Utc::now());
        state.link(&persisted);
        state.categories.insert(id, persisted.clone());

        debug!(id = %id, name = %persisted.name, "inserted category");
        Ok(persisted)
    }

    fn update_category(&self, category: &Category) -> StoreResult<()> {
        let mut state = self.write()?;
        let previous = state
            .categories
            .get(&category.id)
            .cloned()
            .ok_or(StoreError::MissingCategory(category.id))?;
        if let Some(parent) = category.parent {
            state.check_category_exists(parent)?;
        }
        state.check_unique(&category.name, category.parent, Some(category.id))?;

        state.unlink(&previous);
        state.link(category);
        state.categories.insert(category.id, category.clone());

        debug!(id = %category.id, name = %category.name, "updated category");
        Ok(())
    }

    fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&id) {
            return Ok(false);
        }

        let removed = state.subtree(id);
        // Children first so each unlink still finds its parent's index entry.
        for victim in removed.iter().rev() {
            if let Some(category) = state.categories.remove(victim) {
                state.unlink(&category);
            }
        }
        let mut unlinked = 0usize;
        for post in state.posts.values_mut() {
            if post.category.is_some_and(|c| removed.contains(&c)) {
                post.category = None;
                unlinked += 1;
            }
        }

        debug!(id = %id, cascaded = removed.len() - 1, unlinked, "deleted category");
        Ok(true)
    }
}

impl PostStore for InMemoryStore {
    fn find_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.read()?.posts.get(&id).cloned())
    }

    fn find_posts(&self, filter: &PostFilter, page: PageRequest) -> StoreResult<Vec<Post>> {
        let state = self.read()?;
        let mut matching: Vec<&Post> = state.posts.values().filter(|p| filter.matches(p)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect())
    }

    fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut state = self.write()?;
        if let Some(category) = post.category {
            state.check_category_exists(category)?;
        }

        state.last_post_id += 1;
        let id = PostId::new(state.last_post_id);
        let persisted = post.into_persisted(id, Utc::now());
        state.posts.insert(id, persisted.clone());

        debug!(id = %id, category = ?persisted.category, "inserted post");
        Ok(persisted)
    }

    fn update_post(&self, post: &Post) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.posts.contains_key(&post.id) {
            return Err(StoreError::MissingPost(post.id));
        }
        if let Some(category) = post.category {
            state.check_category_exists(category)?;
        }
        state.posts.insert(post.id, post.clone());

        debug!(id = %post.id, "updated post");
        Ok(())
    }

    fn increment_hits(&self, id: PostId) -> StoreResult<Option<Post>> {
        let mut state = self.write()?;
        let Some(post) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        post.add_hit();
        debug!(id = %id, hits = post.hits, "counted post read");
        Ok(Some(post.clone()))
    }

    fn delete_post(&self, id: PostId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let existed = state.posts.remove(&id).is_some();
        if existed {
            debug!(id = %id, "deleted post");
        }
        Ok(existed)
    }

    fn count_posts_grouped_by_category(
        &self,
        visible: Option<bool>,
    ) -> StoreResult<Vec<CategoryPostCount>> {
        let state = self.read()?;
        let mut counts: BTreeMap<CategoryId, u64> = BTreeMap::new();
        for post in state.posts.values() {
            if visible.is_some_and(|v| v != post.visible) {
                continue;
            }
            if let Some(category) = post.category {
                *counts.entry(category).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter_map(|(id, count)| {
                state.categories.get(&id).map(|category| CategoryPostCount {
                    category: category.clone(),
                    count,
                })
            })
            .collect())
    }

    fn count_posts_in_category(&self, category: CategoryId) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state
            .posts
            .values()
            .filter(|p| p.category == Some(category))
            .count() as u64)
    }
}

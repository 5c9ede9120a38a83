use taxon_types::{
    Category, CategoryId, CategoryPostCount, NewCategory, NewPost, PageRequest, Post, PostId,
    PostsCountByCategory,
};

use crate::error::StoreResult;

/// Category persistence.
///
/// All implementations must satisfy these invariants:
/// - `(name, parent)` is unique. `insert_category` and `update_category`
///   fail with `StoreError::UniqueViolation` rather than create a duplicate.
/// - A parent id passed to a write must name an existing category.
/// - `delete_category` cascades to sub-categories and unlinks their posts.
/// - `categories_with_post_counts` yields one row per category, top-level
///   rows first.
pub trait CategoryStore: Send + Sync {
    /// Read a category by identity.
    fn find_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    /// Look up a category by natural key. `parent = None` searches top-level
    /// categories only.
    fn find_category_by_name_and_parent(
        &self,
        name: &str,
        parent: Option<CategoryId>,
    ) -> StoreResult<Option<Category>>;

    /// Check whether a category with this natural key exists.
    fn exists_category_by_name_and_parent(
        &self,
        name: &str,
        parent: Option<CategoryId>,
    ) -> StoreResult<bool> {
        Ok(self.find_category_by_name_and_parent(name, parent)?.is_some())
    }

    /// All categories, ordered by identity.
    fn find_all_categories(&self) -> StoreResult<Vec<Category>>;

    /// Direct children of `parent`, or all top-level categories for `None`.
    fn find_categories_by_parent(&self, parent: Option<CategoryId>) -> StoreResult<Vec<Category>>;

    /// Every category with its visible/invisible post counts.
    ///
    /// `visible = Some(v)` counts only posts whose visibility is `v`; the other
    /// column is then zero. Categories without matching posts still produce a
    /// zero row.
    fn categories_with_post_counts(
        &self,
        visible: Option<bool>,
    ) -> StoreResult<Vec<PostsCountByCategory>>;

    /// Persist a transient category and return it with its new identity.
    fn insert_category(&self, category: NewCategory) -> StoreResult<Category>;

    /// Overwrite a persisted category.
    fn update_category(&self, category: &Category) -> StoreResult<()>;

    /// Delete a category and its sub-categories. Returns `true` if it existed.
    fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;

    /// All top-level categories.
    fn top_level_categories(&self) -> StoreResult<Vec<Category>> {
        self.find_categories_by_parent(None)
    }
}

/// Filter for post scans. `None` fields do not restrict the scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub visible: Option<bool>,
    /// Posts attached to any of these categories.
    pub categories: Option<Vec<CategoryId>>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(visible) = self.visible {
            if post.visible != visible {
                return false;
            }
        }
        match (&self.categories, post.category) {
            (None, _) => true,
            (Some(ids), Some(category)) => ids.contains(&category),
            (Some(_), None) => false,
        }
    }
}

/// Post persistence.
pub trait PostStore: Send + Sync {
    /// Read a post by identity.
    fn find_post(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// Scan posts matching `filter`, newest first, one page at a time.
    fn find_posts(&self, filter: &PostFilter, page: PageRequest) -> StoreResult<Vec<Post>>;

    /// Persist a transient post and return it with its new identity.
    fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    /// Overwrite a persisted post.
    fn update_post(&self, post: &Post) -> StoreResult<()>;

    /// Count one read of a post in a single atomic step and return the
    /// updated post, or `None` if it does not exist.
    fn increment_hits(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// Delete a post. Returns `true` if it existed.
    fn delete_post(&self, id: PostId) -> StoreResult<bool>;

    /// Post count per category, for categories with at least one matching
    /// post. Posts without a category are not counted.
    fn count_posts_grouped_by_category(
        &self,
        visible: Option<bool>,
    ) -> StoreResult<Vec<CategoryPostCount>>;

    /// Number of posts attached directly to `category`.
    fn count_posts_in_category(&self, category: CategoryId) -> StoreResult<u64>;
}

/// A backend offering both halves of the persistence interface.
pub trait Store: CategoryStore + PostStore {}

impl<T: CategoryStore + PostStore + ?Sized> Store for T {}

//! Read-only count projections produced by grouped store scans.

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Visible and invisible post counts of one category.
///
/// Produced by a single grouped scan over all categories with left-join
/// semantics: a category without posts yields a row with zero counts rather
/// than no row. Stores return these rows parents first (every top-level row
/// precedes every sub-category row).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsCountByCategory {
    pub category: Category,
    /// Name of the parent category, `None` for top-level rows.
    pub parent_name: Option<String>,
    pub visible: u64,
    pub invisible: u64,
}

impl PostsCountByCategory {
    pub fn total(&self) -> u64 {
        self.visible + self.invisible
    }
}

/// Number of posts attached to one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPostCount {
    pub category: Category,
    pub count: u64,
}

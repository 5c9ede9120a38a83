//! Change detection for partial updates.
//!
//! An update request carries only the fields the caller wants to change. A
//! field counts as changed when it is present and differs from the current
//! value. A request that changes nothing is rejected with
//! `Conflict(NoChanges)` before any natural key is resolved.

use serde::{Deserialize, Serialize};

use taxon_types::{CategoryKey, Post};

use crate::error::{Conflict, EngineError, EngineResult};

/// Requested changes to a category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    /// New name. `None` keeps the current name.
    pub name: Option<String>,
    /// New parent name. `None` makes the category top-level.
    pub parent: Option<String>,
}

impl CategoryUpdate {
    pub fn new(name: Option<String>, parent: Option<String>) -> Self {
        Self { name, parent }
    }

    /// The natural key the category will have once this update is applied.
    pub fn target_key(&self, before: &CategoryKey) -> CategoryKey {
        let name = self.name.clone().unwrap_or_else(|| before.name.clone());
        CategoryKey::new(name, self.parent.clone())
    }

    /// Whether applying this update to `before` changes anything.
    ///
    /// The parent is always compared, so an absent parent on a sub-category
    /// is a promotion, not a no-op.
    pub fn changes(&self, before: &CategoryKey) -> bool {
        let name_changed = self.name.as_ref().is_some_and(|n| *n != before.name);
        name_changed || self.parent != before.parent
    }
}

/// Requested changes to a post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub visible: Option<bool>,
    pub category: Option<CategoryKey>,
}

impl PostUpdate {
    /// Whether applying this update to `before` changes anything.
    ///
    /// `before_category` is the natural key of the post's current category.
    pub fn changes(&self, before: &Post, before_category: Option<&CategoryKey>) -> bool {
        let title = self.title.as_ref().is_some_and(|t| *t != before.title);
        let content = self.content.as_ref().is_some_and(|c| *c != before.content);
        let visible = self.visible.is_some_and(|v| v != before.visible);
        let category = self
            .category
            .as_ref()
            .is_some_and(|k| Some(k) != before_category);
        title || content || visible || category
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.visible.is_none()
            && self.category.is_none()
    }
}

/// Fail with `Conflict(NoChanges)` unless `changed` holds.
pub fn ensure_changed(changed: bool) -> EngineResult<()> {
    if changed {
        Ok(())
    } else {
        Err(EngineError::Conflict(Conflict::NoChanges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taxon_types::{CategoryId, PostId};

    fn post() -> Post {
        Post {
            id: PostId::new(1),
            category: Some(CategoryId::new(2)),
            title: "hello".into(),
            content: "body".into(),
            hits: 0,
            visible: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    // ---- categories ----

    #[test]
    fn identical_category_update_changes_nothing() {
        let before = CategoryKey::sub("p", "a");
        let update = CategoryUpdate::new(Some("a".into()), Some("p".into()));
        assert!(!update.changes(&before));
        assert!(ensure_changed(update.changes(&before)).is_err());
    }

    #[test]
    fn name_change_detected() {
        let before = CategoryKey::top("a");
        assert!(CategoryUpdate::new(Some("b".into()), None).changes(&before));
    }

    #[test]
    fn absent_name_keeps_current() {
        let before = CategoryKey::top("a");
        let update = CategoryUpdate::new(None, None);
        assert!(!update.changes(&before));
        assert_eq!(update.target_key(&before), before);
    }

    #[test]
    fn dropping_parent_is_a_change() {
        let before = CategoryKey::sub("p", "a");
        let update = CategoryUpdate::new(None, None);
        assert!(update.changes(&before));
        assert_eq!(update.target_key(&before), CategoryKey::top("a"));
    }

    #[test]
    fn moving_under_parent_is_a_change() {
        let before = CategoryKey::top("a");
        let update = CategoryUpdate::new(Some("a".into()), Some("b".into()));
        assert!(update.changes(&before));
        assert_eq!(update.target_key(&before), CategoryKey::sub("b", "a"));
    }

    // ---- posts ----

    #[test]
    fn empty_post_update_changes_nothing() {
        let update = PostUpdate::default();
        assert!(update.is_empty());
        assert!(!update.changes(&post(), None));
    }

    #[test]
    fn same_values_change_nothing() {
        let key = CategoryKey::sub("p", "c");
        let update = PostUpdate {
            title: Some("hello".into()),
            content: Some("body".into()),
            visible: Some(true),
            category: Some(key.clone()),
        };
        assert!(!update.changes(&post(), Some(&key)));
    }

    #[test]
    fn each_field_is_detected() {
        let key = CategoryKey::sub("p", "c");
        let p = post();
        let title = PostUpdate {
            title: Some("bye".into()),
            ..Default::default()
        };
        let visible = PostUpdate {
            visible: Some(false),
            ..Default::default()
        };
        let category = PostUpdate {
            category: Some(CategoryKey::sub("p", "d")),
            ..Default::default()
        };
        assert!(title.changes(&p, Some(&key)));
        assert!(visible.changes(&p, Some(&key)));
        assert!(category.changes(&p, Some(&key)));
    }

    #[test]
    fn first_category_on_uncategorized_post_is_a_change() {
        let mut p = post();
        p.category = None;
        let update = PostUpdate {
            category: Some(CategoryKey::sub("p", "c")),
            ..Default::default()
        };
        assert!(update.changes(&p, None));
    }
}

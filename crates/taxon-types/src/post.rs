use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{CategoryId, PostId};

/// A persisted post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub category: Option<CategoryId>,
    pub title: String,
    pub content: String,
    /// View counter. Bumped by single-item reads, never by list scans.
    pub hits: u64,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Record one single-item read.
    pub fn add_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }
}

/// A transient post, not yet assigned an identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub category: Option<CategoryId>,
    pub title: String,
    pub content: String,
    pub visible: bool,
}

impl NewPost {
    /// Promote to a persisted post with a store-assigned identity.
    pub fn into_persisted(self, id: PostId, created_at: DateTime<Utc>) -> Post {
        Post {
            id,
            category: self.category,
            title: self.title,
            content: self.content,
            hits: 0,
            visible: self.visible,
            created_at,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewPost {
        NewPost {
            category: Some(CategoryId::new(2)),
            title: "hello".into(),
            content: "world".into(),
            visible: true,
        }
    }

    #[test]
    fn persisted_post_starts_with_zero_hits() {
        let post = draft().into_persisted(PostId::new(1), Utc::now());
        assert_eq!(post.hits, 0);
        assert_eq!(post.category, Some(CategoryId::new(2)));
        assert!(post.updated_at.is_none());
    }

    #[test]
    fn add_hit_increments() {
        let mut post = draft().into_persisted(PostId::new(1), Utc::now());
        post.add_hit();
        post.add_hit();
        assert_eq!(post.hits, 2);
    }

    #[test]
    fn add_hit_saturates() {
        let mut post = draft().into_persisted(PostId::new(1), Utc::now());
        post.hits = u64::MAX;
        post.add_hit();
        assert_eq!(post.hits, u64::MAX);
    }
}

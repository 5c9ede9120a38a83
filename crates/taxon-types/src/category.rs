use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::CategoryId;

/// A persisted category.
///
/// The tree is stored as an arena: each category carries only the id of its
/// parent. Child lists are derived from the store's parent index on demand,
/// never kept as live back-references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// `None` for a top-level category.
    pub parent: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    /// Returns `true` if this category has no parent.
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Rewrite name and parent in place, stamping `updated_at`.
    ///
    /// The caller has already resolved `parent` against the store; this only
    /// moves the fields.
    pub fn apply(&mut self, name: String, parent: Option<CategoryId>, now: DateTime<Utc>) {
        self.name = name;
        self.parent = parent;
        self.updated_at = Some(now);
    }
}

/// A transient category: same natural key as a persisted one, no identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub parent: Option<CategoryId>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, parent: Option<CategoryId>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }

    /// Promote to a persisted category with a store-assigned identity.
    pub fn into_persisted(self, id: CategoryId, created_at: DateTime<Utc>) -> Category {
        Category {
            id,
            name: self.name,
            parent: self.parent,
            created_at,
            updated_at: None,
        }
    }
}

/// Natural-key descriptor for a category: its name plus the *name* of its
/// parent, if any.
///
/// Because the tree is at most two levels deep, a parent name always refers
/// to a top-level category, so `(name, parent)` identifies at most one
/// category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl CategoryKey {
    /// Key of a top-level category.
    pub fn top(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    /// Key of a sub-category of `parent`.
    pub fn sub(parent: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
        }
    }

    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent,
        }
    }

    /// Parse `parent/name` or `name`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let mut parts = s.split('/');
        let first = parts.next().unwrap_or_default().trim();
        let second = parts.next().map(str::trim);
        if parts.next().is_some() {
            return Err(TypeError::InvalidKey(format!(
                "{s}: categories are at most two levels deep"
            )));
        }
        match second {
            None if !first.is_empty() => Ok(Self::top(first)),
            Some(name) if !first.is_empty() && !name.is_empty() => Ok(Self::sub(first, name)),
            _ => Err(TypeError::InvalidKey(format!("{s}: empty segment"))),
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{parent}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_top_and_sub_keys() {
        assert_eq!(CategoryKey::parse("rust").unwrap(), CategoryKey::top("rust"));
        assert_eq!(
            CategoryKey::parse("lang/rust").unwrap(),
            CategoryKey::sub("lang", "rust")
        );
    }

    #[test]
    fn parse_rejects_three_levels_and_empty_segments() {
        assert!(CategoryKey::parse("a/b/c").is_err());
        assert!(CategoryKey::parse("").is_err());
        assert!(CategoryKey::parse("/b").is_err());
        assert!(CategoryKey::parse("a/").is_err());
    }

    #[test]
    fn display_matches_parse() {
        let key = CategoryKey::sub("lang", "rust");
        assert_eq!(key.to_string(), "lang/rust");
        assert_eq!(CategoryKey::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn transient_promotes_with_identity() {
        let now = Utc::now();
        let cat = NewCategory::new("rust", Some(CategoryId::new(1)))
            .into_persisted(CategoryId::new(2), now);
        assert_eq!(cat.id, CategoryId::new(2));
        assert_eq!(cat.parent, Some(CategoryId::new(1)));
        assert!(!cat.is_top_level());
        assert!(cat.updated_at.is_none());
    }

    #[test]
    fn apply_stamps_update_time() {
        let now = Utc::now();
        let mut cat = NewCategory::new("a", None).into_persisted(CategoryId::new(1), now);
        cat.apply("b".into(), Some(CategoryId::new(9)), now);
        assert_eq!(cat.name, "b");
        assert_eq!(cat.parent, Some(CategoryId::new(9)));
        assert_eq!(cat.updated_at, Some(now));
    }

    #[test]
    fn key_serde_omits_missing_parent() {
        let json = serde_json::to_string(&CategoryKey::top("a")).unwrap();
        assert_eq!(json, r#"{"name":"a"}"#);
        let parsed: CategoryKey = serde_json::from_str(r#"{"name":"b","parent":"a"}"#).unwrap();
        assert_eq!(parsed, CategoryKey::sub("a", "b"));
    }
}

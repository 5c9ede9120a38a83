//! Engine configuration: post rules, page sizes, and name limits.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Configuration for the consistency engine.
///
/// The post rules differ between deployments: some require every post to sit
/// in a sub-category, others allow uncategorized posts or posts on top-level
/// categories. Each rule is a switch here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Posts must name a category on creation.
    pub require_post_category: bool,
    /// Posts may only be attached to sub-categories.
    pub forbid_top_level_posts: bool,
    /// Deleting a category is also blocked by posts in its sub-categories,
    /// which the store would otherwise unlink during the cascade.
    pub guard_descendant_posts: bool,
    /// Page size used when a post scan does not ask for one.
    pub default_page_size: usize,
    /// Largest page size a post scan may request.
    pub max_page_size: usize,
    /// Longest accepted category name, in characters.
    pub max_name_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_post_category: true,
            forbid_top_level_posts: true,
            guard_descendant_posts: true,
            default_page_size: 8,
            max_page_size: 100,
            max_name_len: 64,
        }
    }
}

impl EngineConfig {
    /// Drop every optional post rule: uncategorized posts and posts on
    /// top-level categories are accepted, and only direct posts block a
    /// category delete.
    pub fn permissive() -> Self {
        Self {
            require_post_category: false,
            forbid_top_level_posts: false,
            guard_descendant_posts: false,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check that the numeric limits are usable.
    pub fn validate(&self) -> EngineResult<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(EngineError::Config("page sizes must be greater than 0".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(EngineError::Config(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        if self.max_name_len == 0 {
            return Err(EngineError::Config("max_name_len must be greater than 0".into()));
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A 1-based page of a post scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    /// Validate and build a page request. Both fields must be at least 1.
    pub fn new(page: usize, size: usize) -> Result<Self, TypeError> {
        if page == 0 {
            return Err(TypeError::InvalidPage("page must be greater than 0".into()));
        }
        if size == 0 {
            return Err(TypeError::InvalidPage("size must be greater than 0".into()));
        }
        Ok(Self { page, size })
    }

    /// First page with the given size.
    pub fn first(size: usize) -> Self {
        Self {
            page: 1,
            size: size.max(1),
        }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }
}

//! Foundation types for taxon.
//!
//! This crate provides the entity, identity, and projection types shared by
//! the store and the consistency engine. Every other taxon crate depends on
//! `taxon-types`.
//!
//! # Key Types
//!
//! - [`CategoryId`] / [`PostId`]: Store-assigned numeric identities
//! - [`Category`] / [`NewCategory`]: Persisted and transient categories
//! - [`CategoryKey`]: Natural-key descriptor `(name, parent name)`
//! - [`Post`] / [`NewPost`]: Persisted and transient posts
//! - [`PostsCountByCategory`]: Flat per-category visible/invisible counts
//! - [`PageRequest`]: 1-based page request for post scans

pub mod category;
pub mod count;
pub mod error;
pub mod identity;
pub mod page;
pub mod post;

pub use category::{Category, CategoryKey, NewCategory};
pub use count::{CategoryPostCount, PostsCountByCategory};
pub use error::TypeError;
pub use identity::{CategoryId, PostId};
pub use page::PageRequest;
pub use post::{NewPost, Post};

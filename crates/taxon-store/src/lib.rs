//! Persistence interface for taxon.
//!
//! The consistency engine never talks to a database directly. It consumes the
//! [`CategoryStore`] and [`PostStore`] traits defined here, so any backend
//! that can answer natural-key lookups and grouped count scans can sit under
//! it.
//!
//! # Storage Backends
//!
//! - [`InMemoryStore`] -- arena-backed store for tests, embedding, and the CLI
//!
//! [`Snapshot`] serializes an [`InMemoryStore`] to a JSON file so the CLI can
//! keep state between invocations.
//!
//! # Design Rules
//!
//! 1. `(name, parent)` is unique across categories. The store enforces it on
//!    every insert and update; checks made above the store are a fast path only.
//! 2. Identities are assigned on insert and never reused.
//! 3. Deleting a category removes its sub-categories too. Posts that pointed
//!    at a removed category are unlinked, not deleted.
//! 4. Grouped count scans return fully materialized rows, parents first.
//! 5. Each mutating call is atomic.

pub mod error;
pub mod memory;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use snapshot::Snapshot;
pub use traits::{CategoryStore, PostFilter, PostStore, Store};

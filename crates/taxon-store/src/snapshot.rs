//! JSON snapshots of an [`InMemoryStore`].
//!
//! A snapshot holds the raw entity lists and the id counters. The derived
//! indexes are not stored; they are rebuilt (and the unique constraint
//! re-checked) when a snapshot is restored.
//!
//! Saving writes to a sibling temp file and renames it over the target, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxon_types::{Category, Post};

use crate::error::{StoreError, StoreResult};
use crate::memory::{InMemoryStore, StoreState};

/// On-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub last_category_id: u64,
    pub last_post_id: u64,
    pub categories: Vec<Category>,
    pub posts: Vec<Post>,
}

impl Snapshot {
    /// Capture the current contents of `store`.
    pub fn capture(store: &InMemoryStore) -> StoreResult<Self> {
        let state = store.read()?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            last_category_id: state.last_category_id,
            last_post_id: state.last_post_id,
            categories: state.categories.values().cloned().collect(),
            posts: state.posts.values().cloned().collect(),
        })
    }

    /// Build a store from this snapshot, validating referential integrity,
    /// the two-level tree shape, and natural-key uniqueness.
    pub fn restore(self) -> StoreResult<InMemoryStore> {
        if self.version > SNAPSHOT_VERSION {
            return Err(StoreError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        let state = StoreState::from_parts(
            self.categories,
            self.posts,
            self.last_category_id,
            self.last_post_id,
        )?;
        Ok(InMemoryStore::from_state(state))
    }

    /// Read a snapshot file. A missing file yields an empty snapshot.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot file; starting empty");
                return Ok(Self {
                    version: SNAPSHOT_VERSION,
                    ..Self::default()
                });
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Self = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        debug!(
            path = %path.display(),
            categories = snapshot.categories.len(),
            posts = snapshot.posts.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Write this snapshot to `path`, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), bytes = json.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{CategoryStore, PostStore};
    use taxon_types::{CategoryId, NewCategory, NewPost};

    fn populated() -> InMemoryStore {
        let store = InMemoryStore::new();
        let lang = store.insert_category(NewCategory::new("lang", None)).unwrap();
        let rust = store
            .insert_category(NewCategory::new("rust", Some(lang.id)))
            .unwrap();
        store
            .insert_post(NewPost {
                category: Some(rust.id),
                title: "ownership".into(),
                content: "borrowck".into(),
                visible: true,
            })
            .unwrap();
        store
    }

    #[test]
    fn save_then_load_restores_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxon.json");

        Snapshot::capture(&populated()).unwrap().save(&path).unwrap();
        let restored = Snapshot::load(&path).unwrap().restore().unwrap();

        assert_eq!(restored.category_count().unwrap(), 2);
        assert_eq!(restored.post_count().unwrap(), 1);
        let lang = restored
            .find_category_by_name_and_parent("lang", None)
            .unwrap()
            .unwrap();
        assert_eq!(restored.find_categories_by_parent(Some(lang.id)).unwrap().len(), 1);
    }

    #[test]
    fn restored_store_continues_id_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxon.json");
        let store = populated();
        // Burn an id so the counter is ahead of the highest live id.
        let tmp = store.insert_category(NewCategory::new("tmp", None)).unwrap();
        store.delete_category(tmp.id).unwrap();
        Snapshot::capture(&store).unwrap().save(&path).unwrap();

        let restored = Snapshot::load(&path).unwrap().restore().unwrap();
        let next = restored
            .insert_category(NewCategory::new("new", None))
            .unwrap();
        assert_eq!(next.id, CategoryId::new(4));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::load(&dir.path().join("absent.json")).unwrap();
        assert!(snapshot.categories.is_empty());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn duplicate_natural_key_is_rejected_on_restore() {
        let mut snapshot = Snapshot::capture(&populated()).unwrap();
        let mut dup = snapshot.categories[0].clone();
        dup.id = CategoryId::new(snapshot.last_category_id + 1);
        snapshot.last_category_id += 1;
        snapshot.categories.push(dup);

        let err = snapshot.restore().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn self_parent_is_rejected_on_restore() {
        let mut snapshot = Snapshot::capture(&populated()).unwrap();
        let lang = snapshot.categories[0].id;
        snapshot.categories[0].parent = Some(lang);
        let err = snapshot.restore().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn third_level_category_is_rejected_on_restore() {
        let mut snapshot = Snapshot::capture(&populated()).unwrap();
        let rust = snapshot.categories[1].clone();
        let mut deep = rust.clone();
        deep.id = CategoryId::new(snapshot.last_category_id + 1);
        deep.name = "async".into();
        deep.parent = Some(rust.id);
        snapshot.last_category_id += 1;
        snapshot.categories.push(deep);

        let err = snapshot.restore().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn parent_cycle_is_rejected_on_restore() {
        let mut snapshot = Snapshot::capture(&populated()).unwrap();
        // lang -> rust -> lang
        let rust = snapshot.categories[1].id;
        snapshot.categories[0].parent = Some(rust);
        let err = snapshot.restore().unwrap_err();
        assert!(matches!(err, StoreError::CorruptSnapshot(_)));
    }

    #[test]
    fn dangling_post_category_is_rejected_on_restore() {
        let mut snapshot = Snapshot::capture(&populated()).unwrap();
        snapshot.posts[0].category = Some(CategoryId::new(99));
        assert!(snapshot.restore().is_err());
    }

    #[test]
    fn garbage_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"not json").unwrap();
        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}

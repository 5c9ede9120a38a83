//! Post-count rollup.
//!
//! The store reports one flat row per category. [`aggregate`] folds those rows
//! into a two-level tree where each top-level node's counts include its
//! sub-categories. The fold is two passes over the rows (roots first, then
//! children), so it does not depend on the order the store returns them in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use taxon_types::{CategoryId, PostsCountByCategory};

use crate::error::{EngineError, EngineResult};

/// One node in the post-count tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsCountModel {
    pub id: CategoryId,
    pub name: String,
    pub parent_name: Option<String>,
    /// Visible posts in this category and, for a root, its children.
    pub visible: u64,
    /// Invisible posts in this category and, for a root, its children.
    pub invisible: u64,
    pub children: Vec<PostsCountModel>,
}

impl PostsCountModel {
    fn from_row(row: &PostsCountByCategory) -> Self {
        Self {
            id: row.category.id,
            name: row.category.name.clone(),
            parent_name: row.parent_name.clone(),
            visible: row.visible,
            invisible: row.invisible,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_name.is_none()
    }

    pub fn total(&self) -> u64 {
        self.visible + self.invisible
    }

    /// Attach `child` and fold its counts into this node.
    ///
    /// Only roots take children, and the child must name this node as its
    /// parent.
    pub fn add_child(&mut self, child: PostsCountModel) -> EngineResult<()> {
        if !self.is_root() {
            return Err(EngineError::Internal(format!(
                "cannot add {} under non-root {}",
                child.name, self.name
            )));
        }
        if child.parent_name.as_deref() != Some(self.name.as_str()) {
            return Err(EngineError::Internal(format!(
                "{} names parent {:?}, not {}",
                child.name, child.parent_name, self.name
            )));
        }
        self.visible += child.visible;
        self.invisible += child.invisible;
        self.children.push(child);
        Ok(())
    }
}

/// Post counts for the whole category forest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsCountTree {
    pub roots: Vec<PostsCountModel>,
}

impl PostsCountTree {
    pub fn visible(&self) -> u64 {
        self.roots.iter().map(|r| r.visible).sum()
    }

    pub fn invisible(&self) -> u64 {
        self.roots.iter().map(|r| r.invisible).sum()
    }

    pub fn total(&self) -> u64 {
        self.visible() + self.invisible()
    }

    pub fn find(&self, name: &str) -> Option<&PostsCountModel> {
        self.roots.iter().find(|r| r.name == name)
    }

    /// Number of nodes, roots and children together.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(|r| 1 + r.children.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Fold flat per-category rows into a [`PostsCountTree`].
///
/// Roots keep the order they appear in `rows`; children keep their relative
/// order under each root. A child row whose parent is not among the rows is an
/// internal error: the store handed back an inconsistent snapshot.
pub fn aggregate(rows: &[PostsCountByCategory]) -> EngineResult<PostsCountTree> {
    let mut roots = Vec::new();
    let mut index: HashMap<CategoryId, usize> = HashMap::new();

    for row in rows.iter().filter(|r| r.category.parent.is_none()) {
        index.insert(row.category.id, roots.len());
        roots.push(PostsCountModel::from_row(row));
    }

    for row in rows {
        let Some(parent) = row.category.parent else {
            continue;
        };
        let slot = index.get(&parent).copied().ok_or_else(|| {
            EngineError::Internal(format!(
                "count row for {} references unknown parent {parent}",
                row.category.name
            ))
        })?;
        roots[slot].add_child(PostsCountModel::from_row(row))?;
    }

    Ok(PostsCountTree { roots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use taxon_types::Category;

    fn row(
        id: u64,
        name: &str,
        parent: Option<(u64, &str)>,
        v: u64,
        i: u64,
    ) -> PostsCountByCategory {
        PostsCountByCategory {
            category: Category {
                id: CategoryId::new(id),
                name: name.into(),
                parent: parent.map(|(pid, _)| CategoryId::new(pid)),
                created_at: Utc::now(),
                updated_at: None,
            },
            parent_name: parent.map(|(_, pname)| pname.to_string()),
            visible: v,
            invisible: i,
        }
    }

    #[test]
    fn rolls_children_into_parent() {
        let rows = vec![
            row(1, "p", None, 4, 1),
            row(2, "c1", Some((1, "p")), 2, 0),
            row(3, "c2", Some((1, "p")), 1, 1),
        ];
        let tree = aggregate(&rows).unwrap();

        assert_eq!(tree.roots.len(), 1);
        let p = tree.find("p").unwrap();
        assert_eq!((p.visible, p.invisible), (7, 2));
        assert_eq!(p.children.len(), 2);
        assert_eq!((p.children[0].visible, p.children[0].invisible), (2, 0));
        assert_eq!((p.children[1].visible, p.children[1].invisible), (1, 1));
        assert_eq!(tree.total(), 9);
    }

    #[test]
    fn children_before_parent_still_fold() {
        let rows = vec![
            row(2, "c1", Some((1, "p")), 2, 0),
            row(1, "p", None, 0, 0),
        ];
        let tree = aggregate(&rows).unwrap();
        assert_eq!(tree.find("p").unwrap().visible, 2);
    }

    #[test]
    fn empty_rows_give_empty_tree() {
        let tree = aggregate(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.total(), 0);
    }

    #[test]
    fn orphan_row_is_internal_error() {
        let rows = vec![row(2, "c1", Some((9, "ghost")), 1, 0)];
        let err = aggregate(&rows).unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn non_root_rejects_children() {
        let mut child = PostsCountModel::from_row(&row(2, "c", Some((1, "p")), 0, 0));
        let grandchild = PostsCountModel::from_row(&row(3, "g", Some((2, "c")), 0, 0));
        assert!(child.add_child(grandchild).is_err());
    }

    #[test]
    fn mismatched_parent_name_rejected() {
        let mut root = PostsCountModel::from_row(&row(1, "p", None, 0, 0));
        let stranger = PostsCountModel::from_row(&row(2, "c", Some((5, "q")), 0, 0));
        assert!(root.add_child(stranger).is_err());
        assert!(root.children.is_empty());
    }

    fn forest() -> impl Strategy<Value = Vec<PostsCountByCategory>> {
        // Each root carries its own counts and a list of child counts.
        let counts = (0u64..50, 0u64..50);
        proptest::collection::vec(
            (counts.clone(), proptest::collection::vec(counts, 0..5)),
            0..6,
        )
        .prop_map(|roots| {
            let mut rows = Vec::new();
            let mut next = 1u64;
            for (r, ((v, i), children)) in roots.into_iter().enumerate() {
                let root_id = next;
                let root_name = format!("root{r}");
                next += 1;
                rows.push(row(root_id, &root_name, None, v, i));
                for (c, (cv, ci)) in children.into_iter().enumerate() {
                    let name = format!("child{r}_{c}");
                    let parent = Some((root_id, root_name.as_str()));
                    rows.push(row(next, &name, parent, cv, ci));
                    next += 1;
                }
            }
            rows
        })
    }

    proptest! {
        #[test]
        fn rollup_preserves_totals(rows in forest()) {
            let tree = aggregate(&rows).unwrap();
            let visible: u64 = rows.iter().map(|r| r.visible).sum();
            let invisible: u64 = rows.iter().map(|r| r.invisible).sum();
            prop_assert_eq!(tree.visible(), visible);
            prop_assert_eq!(tree.invisible(), invisible);
            prop_assert_eq!(tree.node_count(), rows.len());
        }

        #[test]
        fn rollup_ignores_row_order(rows in forest()) {
            let forward = aggregate(&rows).unwrap();
            let mut reversed = rows.clone();
            reversed.reverse();
            let backward = aggregate(&reversed).unwrap();
            prop_assert_eq!(forward.total(), backward.total());
            for root in &forward.roots {
                let other = backward.find(&root.name).unwrap();
                prop_assert_eq!((root.visible, root.invisible), (other.visible, other.invisible));
                prop_assert_eq!(root.children.len(), other.children.len());
            }
        }

        #[test]
        fn each_root_equals_own_plus_children(rows in forest()) {
            let tree = aggregate(&rows).unwrap();
            for root in &tree.roots {
                let own = rows.iter().find(|r| r.category.id == root.id).unwrap();
                let from_children: u64 = root.children.iter().map(|c| c.total()).sum();
                prop_assert_eq!(root.total(), own.total() + from_children);
            }
        }
    }
}

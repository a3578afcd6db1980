//! Parent/child index over reporting entities.
//!
//! Links come from the `subentities` lists of loaded records. The dotted form of
//! identifiers is only consulted when a link is missing, and every walk is
//! bounded so malformed hierarchies fail instead of spinning.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::warn;

use crate::entity::{Entity, EntityId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("no ancestor of {id} is part of the root set")]
    AncestorNotFound { id: EntityId },
}

/// Find the nearest ancestor of `id` (itself included) present in `roots` by
/// stripping trailing dot-segments.
pub fn nearest_root_ancestor(
    id: &EntityId,
    roots: &BTreeSet<EntityId>,
) -> Result<EntityId, HierarchyError> {
    let mut candidate = Some(id.clone());
    while let Some(current) = candidate {
        if roots.contains(&current) {
            return Ok(current);
        }
        candidate = current.parent();
    }
    Err(HierarchyError::AncestorNotFound { id: id.clone() })
}

#[derive(Clone, Debug, Default)]
pub struct HierarchyIndex {
    roots: Vec<EntityId>,
    root_set: BTreeSet<EntityId>,
    parents: HashMap<EntityId, EntityId>,
}

impl HierarchyIndex {
    pub fn with_roots(roots: impl IntoIterator<Item = EntityId>) -> Self {
        let mut index = Self::default();
        for root in roots {
            if index.root_set.insert(root.clone()) {
                index.roots.push(root);
            }
        }
        index
    }

    /// Root ids in the order they were supplied.
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn is_root(&self, id: &EntityId) -> bool {
        self.root_set.contains(id)
    }

    /// Record the parent links declared by `entity`.
    pub fn record(&mut self, entity: &Entity) {
        for child in &entity.subentities {
            self.link(child, &entity.id);
        }
    }

    /// Link `child` to `parent`. The first declared parent wins.
    pub fn link(&mut self, child: &EntityId, parent: &EntityId) {
        if child == parent {
            warn!("Ignoring self-referencing subentity {child}");
            return;
        }
        match self.parents.get(child) {
            Some(existing) if existing != parent => {
                warn!("{child} is listed under both {existing} and {parent}; keeping {existing}");
            }
            Some(_) => {}
            None => {
                self.parents.insert(child.clone(), parent.clone());
            }
        }
    }

    pub fn parent_of(&self, id: &EntityId) -> Option<&EntityId> {
        self.parents.get(id)
    }

    /// Whether some loaded record lists `id` as a subentity.
    pub fn is_known_child(&self, id: &EntityId) -> bool {
        self.parents.contains_key(id)
    }

    /// Nearest root-set member reachable from `id` (itself included).
    ///
    /// Explicit links are followed first; when none is recorded the trailing
    /// dot-segment is stripped instead.
    pub fn nearest_root_ancestor(&self, id: &EntityId) -> Result<EntityId, HierarchyError> {
        let mut visited = HashSet::new();
        let mut current = id.clone();
        loop {
            if self.is_root(&current) {
                return Ok(current);
            }
            if !visited.insert(current.clone()) {
                break;
            }
            let next = match self.parents.get(&current) {
                Some(parent) => parent.clone(),
                None => match current.parent() {
                    Some(parent) => parent,
                    None => break,
                },
            };
            current = next;
        }
        Err(HierarchyError::AncestorNotFound { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> BTreeSet<EntityId> {
        values.iter().map(|v| EntityId::from(*v)).collect()
    }

    #[test]
    fn strips_segments_until_root() {
        let found = nearest_root_ancestor(&EntityId::from("a.b.c.d"), &ids(&["a.b"])).unwrap();
        assert_eq!(found, EntityId::from("a.b"));
    }

    #[test]
    fn empty_root_set_fails() {
        let err = nearest_root_ancestor(&EntityId::from("a.b.c.d"), &ids(&[])).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::AncestorNotFound {
                id: EntityId::from("a.b.c.d")
            }
        );
    }

    #[test]
    fn root_is_its_own_ancestor() {
        let index = HierarchyIndex::with_roots([EntityId::from("x")]);
        assert_eq!(
            index.nearest_root_ancestor(&EntityId::from("x")).unwrap(),
            EntityId::from("x")
        );
    }

    #[test]
    fn follows_explicit_links_before_segments() {
        let mut index = HierarchyIndex::with_roots([EntityId::from("campus")]);
        index.record(&Entity::new("campus", "Campus").with_subentities(["library"]));
        assert_eq!(
            index.nearest_root_ancestor(&EntityId::from("library")).unwrap(),
            EntityId::from("campus")
        );
        assert_eq!(index.parent_of(&EntityId::from("library")), Some(&EntityId::from("campus")));
    }

    #[test]
    fn cyclic_links_terminate() {
        let mut index = HierarchyIndex::with_roots([EntityId::from("root")]);
        index.link(&EntityId::from("p"), &EntityId::from("q"));
        index.link(&EntityId::from("q"), &EntityId::from("p"));
        assert!(index.nearest_root_ancestor(&EntityId::from("p")).is_err());
    }

    #[test]
    fn first_parent_wins() {
        let mut index = HierarchyIndex::default();
        index.link(&EntityId::from("c"), &EntityId::from("a"));
        index.link(&EntityId::from("c"), &EntityId::from("b"));
        assert_eq!(index.parent_of(&EntityId::from("c")), Some(&EntityId::from("a")));
        assert!(index.is_known_child(&EntityId::from("c")));
    }

    #[test]
    fn duplicate_roots_are_collapsed() {
        let index = HierarchyIndex::with_roots(["a", "b", "a"].map(EntityId::from));
        assert_eq!(index.roots(), &[EntityId::from("a"), EntityId::from("b")]);
    }
}

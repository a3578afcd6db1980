//! Per-map session state: lock flag, loaded records, hierarchy and the cache
//! of built detail popups.

use std::collections::HashMap;

use crate::{
    controller::ControllerError,
    detail::{DetailOptions, DetailPopup},
    entity::{Entity, EntityId},
    hierarchy::HierarchyIndex,
};

#[derive(Debug, Default)]
pub struct Session {
    locked: bool,
    catalog: HashMap<EntityId, Entity>,
    hierarchy: HierarchyIndex,
    details: HashMap<EntityId, DetailPopup>,
}

impl Session {
    pub fn new(roots: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            hierarchy: HierarchyIndex::with_roots(roots),
            ..Self::default()
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Flip the lock and return its new value.
    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }

    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.catalog.get(id)
    }

    /// Keep a loaded record and index its children.
    pub fn remember(&mut self, entity: Entity) {
        self.hierarchy.record(&entity);
        self.catalog.insert(entity.id.clone(), entity);
    }

    /// Record that `child` was materialized on behalf of `parent`.
    pub fn adopt(&mut self, child: &EntityId, parent: &EntityId) {
        self.hierarchy.link(child, parent);
    }

    /// Direct children listed by `id`'s record.
    pub fn subentities(&self, id: &EntityId) -> Vec<EntityId> {
        self.catalog
            .get(id)
            .map(|entity| entity.subentities.clone())
            .unwrap_or_default()
    }

    /// Loaded records that list `id` among their direct children.
    pub fn listing_parents<'a>(&'a self, id: &'a EntityId) -> impl Iterator<Item = &'a EntityId> {
        self.catalog
            .values()
            .filter(move |entity| entity.subentities.contains(id))
            .map(|entity| &entity.id)
    }

    /// Detail popup for `id`, built on first use and cached afterwards.
    pub fn detail(
        &mut self,
        id: &EntityId,
        options: &DetailOptions,
    ) -> Result<&DetailPopup, ControllerError> {
        if !self.details.contains_key(id) {
            let entity = self
                .catalog
                .get(id)
                .ok_or_else(|| ControllerError::MissingRecord(id.clone()))?;
            let source_id = self.hierarchy.nearest_root_ancestor(id)?;
            let source = self
                .catalog
                .get(&source_id)
                .ok_or(ControllerError::MissingRecord(source_id))?;
            let popup = DetailPopup::build(entity, source, options);
            self.details.insert(id.clone(), popup);
        }
        self.details
            .get(id)
            .ok_or_else(|| ControllerError::MissingRecord(id.clone()))
    }

    pub fn has_detail(&self, id: &EntityId) -> bool {
        self.details.contains_key(id)
    }
}

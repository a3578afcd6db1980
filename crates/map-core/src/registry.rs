//! Entity id → rendered layer bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{entity::EntityId, visibility::DisplayMode};

/// Opaque handle issued by a [`crate::MapSurface`] for a rendered layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerHandle(pub u64);

/// Progress of the lazy fetch of an entity's direct children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildrenState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerEntry {
    pub layer: LayerHandle,
    pub mode: DisplayMode,
    pub children: ChildrenState,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("entity {0} has no rendered layer")]
    UnknownEntity(EntityId),
    #[error("entity {0} already has a rendered layer")]
    AlreadyRegistered(EntityId),
}

/// Single source of truth for which mode each rendered polygon is in.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    entries: BTreeMap<EntityId, LayerEntry>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: EntityId,
        layer: LayerHandle,
        mode: DisplayMode,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.entries.insert(
            id,
            LayerEntry {
                layer,
                mode,
                children: ChildrenState::Unloaded,
            },
        );
        Ok(())
    }

    pub fn get(&self, id: &EntityId) -> Result<&LayerEntry, RegistryError> {
        self.entries
            .get(id)
            .ok_or_else(|| RegistryError::UnknownEntity(id.clone()))
    }

    pub fn mode(&self, id: &EntityId) -> Result<DisplayMode, RegistryError> {
        self.get(id).map(|entry| entry.mode)
    }

    pub fn set_mode(&mut self, id: &EntityId, mode: DisplayMode) -> Result<(), RegistryError> {
        self.entry_mut(id)?.mode = mode;
        Ok(())
    }

    pub fn set_children(
        &mut self,
        id: &EntityId,
        state: ChildrenState,
    ) -> Result<(), RegistryError> {
        self.entry_mut(id)?.children = state;
        Ok(())
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by entity id.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &LayerEntry)> {
        self.entries.iter()
    }

    fn entry_mut(&mut self, id: &EntityId) -> Result<&mut LayerEntry, RegistryError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownEntity(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_update() {
        let mut registry = LayerRegistry::new();
        let id = EntityId::from("X");
        registry
            .register(id.clone(), LayerHandle(1), DisplayMode::ParentIdle)
            .unwrap();
        registry.set_mode(&id, DisplayMode::ParentHover).unwrap();
        registry.set_children(&id, ChildrenState::Loading).unwrap();

        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.layer, LayerHandle(1));
        assert_eq!(entry.mode, DisplayMode::ParentHover);
        assert_eq!(entry.children, ChildrenState::Loading);
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let mut registry = LayerRegistry::new();
        let id = EntityId::from("missing");
        assert_eq!(
            registry.get(&id).unwrap_err(),
            RegistryError::UnknownEntity(id.clone())
        );
        assert!(registry.set_mode(&id, DisplayMode::ParentIdle).is_err());
    }

    #[test]
    fn one_entry_per_id() {
        let mut registry = LayerRegistry::new();
        let id = EntityId::from("X");
        registry
            .register(id.clone(), LayerHandle(1), DisplayMode::ParentIdle)
            .unwrap();
        let err = registry
            .register(id.clone(), LayerHandle(2), DisplayMode::ChildHidden)
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered(id.clone()));
        assert_eq!(registry.get(&id).unwrap().layer, LayerHandle(1));
        assert_eq!(registry.len(), 1);
    }
}

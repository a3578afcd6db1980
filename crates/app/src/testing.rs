//! In-memory repository and fixtures for the unit tests.

use std::{collections::HashMap, sync::Arc};

use map_core::{
    Entity, EntityId, EntityRepository, Feature, FeatureCollection, RepositoryError,
};
use serde_json::json;

use crate::{
    bootstrap::{MapController, build_controller},
    config::{IndexSource, LoaderMode, MapConfig},
};

pub fn square() -> FeatureCollection {
    FeatureCollection::new(vec![Feature::new(json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
    }))])
}

#[derive(Default)]
pub struct MemoryRepository {
    index: Vec<EntityId>,
    entities: HashMap<EntityId, Entity>,
    geometry: HashMap<EntityId, FeatureCollection>,
}

impl MemoryRepository {
    pub fn with_roots(roots: &[&str]) -> Self {
        Self {
            index: roots.iter().map(|id| EntityId::from(*id)).collect(),
            ..Self::default()
        }
    }

    pub fn insert(mut self, entity: Entity) -> Self {
        self.geometry.insert(entity.id.clone(), square());
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn insert_without_geometry(mut self, entity: Entity) -> Self {
        self.geometry.insert(entity.id.clone(), FeatureCollection::new(Vec::new()));
        self.entities.insert(entity.id.clone(), entity);
        self
    }
}

impl EntityRepository for MemoryRepository {
    fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError> {
        Ok(self.index.clone())
    }

    fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError> {
        self.entities
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                target: id.to_string(),
            })
    }

    fn fetch_geometry(&self, id: &EntityId) -> Result<FeatureCollection, RepositoryError> {
        self.geometry
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                target: id.to_string(),
            })
    }
}

/// Root `X` with children `X.a` and `X.b`; only `X` reports emissions.
pub fn campus() -> MemoryRepository {
    MemoryRepository::with_roots(&["X"])
        .insert(
            Entity::new("X", "Ex College")
                .with_subentities(["X.a", "X.b"])
                .with_emission("gas", 3.0)
                .with_emission("electricity", 6.0),
        )
        .insert(Entity::new("X.a", "Library"))
        .insert(Entity::new("X.b", "Chapel"))
}

pub fn controller_for(repository: Arc<dyn EntityRepository>, mode: LoaderMode) -> MapController {
    let mut config = MapConfig::default();
    config.index = IndexSource::Remote;
    config.fetch_workers = 2;
    build_controller(&config, repository, mode).unwrap()
}

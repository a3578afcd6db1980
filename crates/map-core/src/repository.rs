//! Data access seams: the entity repository and the loader that delivers
//! lazily materialized children to the controller.

use std::sync::Arc;

use thiserror::Error;

use crate::entity::{Entity, EntityId, FeatureCollection};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no record for {target}")]
    NotFound { target: String },
    #[error("request for {target} failed: {message}")]
    Network { target: String, message: String },
    #[error("could not decode {target}: {message}")]
    Decode { target: String, message: String },
}

/// Remote, read-only source of reporting entities. Nothing is memoized.
pub trait EntityRepository: Send + Sync {
    /// Identifiers of the entities shown on initial load.
    fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError>;

    fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError>;

    fn fetch_geometry(&self, id: &EntityId) -> Result<FeatureCollection, RepositoryError>;

    /// Geometry for a loaded record. Implementations that can follow the
    /// record's own `geojson` path override this.
    fn fetch_geometry_for(&self, entity: &Entity) -> Result<FeatureCollection, RepositoryError> {
        self.fetch_geometry(&entity.id)
    }
}

impl<R: EntityRepository + ?Sized> EntityRepository for Arc<R> {
    fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError> {
        (**self).fetch_index()
    }

    fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError> {
        (**self).fetch_entity(id)
    }

    fn fetch_geometry(&self, id: &EntityId) -> Result<FeatureCollection, RepositoryError> {
        (**self).fetch_geometry(id)
    }

    fn fetch_geometry_for(&self, entity: &Entity) -> Result<FeatureCollection, RepositoryError> {
        (**self).fetch_geometry_for(entity)
    }
}

/// Record plus geometry, ready to be rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedEntity {
    pub entity: Entity,
    pub geometry: FeatureCollection,
}

/// Fetch a record and then its geometry.
pub fn load_entity(
    repository: &dyn EntityRepository,
    id: &EntityId,
) -> Result<LoadedEntity, RepositoryError> {
    let entity = repository.fetch_entity(id)?;
    let geometry = repository.fetch_geometry_for(&entity)?;
    Ok(LoadedEntity { entity, geometry })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    pub parent: EntityId,
    pub child: EntityId,
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub parent: EntityId,
    pub child: EntityId,
    pub result: Result<LoadedEntity, RepositoryError>,
}

/// Delivers child entities requested during materialization.
///
/// `request` must not block on the controller; results are collected with
/// `poll`, which the controller calls right after issuing requests and before
/// every event.
pub trait ChildLoader {
    fn request(&mut self, request: LoadRequest);

    fn poll(&mut self) -> Vec<LoadOutcome>;
}

impl<L: ChildLoader + ?Sized> ChildLoader for Box<L> {
    fn request(&mut self, request: LoadRequest) {
        (**self).request(request)
    }

    fn poll(&mut self) -> Vec<LoadOutcome> {
        (**self).poll()
    }
}

/// Fetches synchronously inside `request`; outcomes are ready on the next `poll`.
pub struct BlockingLoader {
    repository: Arc<dyn EntityRepository>,
    ready: Vec<LoadOutcome>,
}

impl BlockingLoader {
    pub fn new(repository: Arc<dyn EntityRepository>) -> Self {
        Self {
            repository,
            ready: Vec::new(),
        }
    }
}

impl ChildLoader for BlockingLoader {
    fn request(&mut self, request: LoadRequest) {
        let result = load_entity(self.repository.as_ref(), &request.child);
        self.ready.push(LoadOutcome {
            parent: request.parent,
            child: request.child,
            result,
        });
    }

    fn poll(&mut self) -> Vec<LoadOutcome> {
        std::mem::take(&mut self.ready)
    }
}

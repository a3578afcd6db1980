//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use map_core::{
    ChildLoader, DetailOptions, Entity, EntityId, EntityRepository, Feature, FeatureCollection,
    InteractionController, LatLng, LayerHandle, LoadOutcome, LoadRequest, MapSurface, Paint,
    PopupContent, RepositoryError, load_entity,
};
use serde_json::json;

pub const HERE: LatLng = LatLng::new(52.205, 0.1218);

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
    entity_fetches: Mutex<Vec<EntityId>>,
}

impl MemoryRepository {
    pub fn with_roots(roots: &[&str]) -> Self {
        Self {
            index: roots.iter().map(|id| EntityId::from(*id)).collect(),
            ..Self::default()
        }
    }

    /// Add a record with a one-square geometry.
    pub fn insert(mut self, entity: Entity) -> Self {
        self.geometry.insert(entity.id.clone(), square());
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    /// Add a record whose geometry document is missing.
    pub fn insert_without_geometry(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn entity_fetches(&self, id: &str) -> usize {
        self.entity_fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| fetched.as_str() == id)
            .count()
    }
}

impl EntityRepository for MemoryRepository {
    fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError> {
        Ok(self.index.clone())
    }

    fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError> {
        self.entity_fetches.lock().unwrap().push(id.clone());
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
                target: format!("geojson/{id}"),
            })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    AddLayer(EntityId, LayerHandle, Paint),
    SetPaint(LayerHandle, Paint),
    BringToFront(LayerHandle),
    OpenPopup(LayerHandle, PopupContent),
    MovePopup(LatLng),
    ClosePopup,
}

/// Surface that records calls and tracks the single popup.
#[derive(Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
    pub popup: Option<(LayerHandle, PopupContent, LatLng)>,
    next: u64,
}

impl RecordingSurface {
    pub fn added(&self) -> Vec<EntityId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::AddLayer(id, _, _) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn popup_content(&self) -> Option<&PopupContent> {
        self.popup.as_ref().map(|(_, content, _)| content)
    }
}

impl MapSurface for RecordingSurface {
    fn add_layer(
        &mut self,
        entity: &Entity,
        _geometry: &FeatureCollection,
        paint: Paint,
    ) -> LayerHandle {
        self.next += 1;
        let handle = LayerHandle(self.next);
        self.calls.push(SurfaceCall::AddLayer(entity.id.clone(), handle, paint));
        handle
    }

    fn set_paint(&mut self, layer: LayerHandle, paint: Paint) {
        self.calls.push(SurfaceCall::SetPaint(layer, paint));
    }

    fn bring_to_front(&mut self, layer: LayerHandle) {
        self.calls.push(SurfaceCall::BringToFront(layer));
    }

    fn open_popup(&mut self, layer: LayerHandle, content: &PopupContent, at: LatLng) {
        self.calls.push(SurfaceCall::OpenPopup(layer, content.clone()));
        self.popup = Some((layer, content.clone(), at));
    }

    fn move_popup(&mut self, at: LatLng) {
        self.calls.push(SurfaceCall::MovePopup(at));
        if let Some((_, _, position)) = self.popup.as_mut() {
            *position = at;
        }
    }

    fn close_popup(&mut self) {
        self.calls.push(SurfaceCall::ClosePopup);
        self.popup = None;
    }
}

/// Loader whose outcomes are released by the test, to hold fetches in flight.
#[derive(Clone)]
pub struct ManualLoader {
    repository: Arc<MemoryRepository>,
    pending: Arc<Mutex<Vec<LoadRequest>>>,
    ready: Arc<Mutex<Vec<LoadOutcome>>>,
}

impl ManualLoader {
    pub fn new(repository: Arc<MemoryRepository>) -> Self {
        Self {
            repository,
            pending: Arc::default(),
            ready: Arc::default(),
        }
    }

    pub fn pending(&self) -> Vec<LoadRequest> {
        self.pending.lock().unwrap().clone()
    }

    /// Complete every pending request; results show up on the next poll.
    pub fn release_all(&self) {
        let requests: Vec<LoadRequest> = self.pending.lock().unwrap().drain(..).collect();
        let mut ready = self.ready.lock().unwrap();
        for request in requests {
            let result = load_entity(self.repository.as_ref(), &request.child);
            ready.push(LoadOutcome {
                parent: request.parent,
                child: request.child,
                result,
            });
        }
    }
}

impl ChildLoader for ManualLoader {
    fn request(&mut self, request: LoadRequest) {
        self.pending.lock().unwrap().push(request);
    }

    fn poll(&mut self) -> Vec<LoadOutcome> {
        std::mem::take(&mut *self.ready.lock().unwrap())
    }
}

/// Controller with every root of `repository` rendered, as the bootstrap does.
pub fn bootstrapped<L: ChildLoader>(
    repository: &MemoryRepository,
    loader: L,
) -> InteractionController<RecordingSurface, L> {
    let roots = repository.fetch_index().unwrap();
    let mut controller = InteractionController::new(
        RecordingSurface::default(),
        loader,
        roots.clone(),
        DetailOptions::default(),
    );
    for id in roots {
        if let Ok(loaded) = load_entity(repository, &id) {
            controller.render_root(loaded).unwrap();
        }
    }
    controller
}

/// Root `X` with children `X.a` and `X.b`.
pub fn campus() -> MemoryRepository {
    MemoryRepository::with_roots(&["X"])
        .insert(
            Entity::new("X", "Ex College")
                .with_subentities(["X.a", "X.b"])
                .with_emission("gas", 3.0)
                .with_emission("electricity", 6.0),
        )
        .insert(Entity::new("X.a", "Library"))
        .insert(Entity::new("X.b", "Hall"))
}

pub fn id(value: &str) -> EntityId {
    EntityId::from(value)
}

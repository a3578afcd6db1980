//! Core logic of the carbon map overlay: reporting entities, their hierarchy,
//! the per-layer visibility state machine and the controller that applies it
//! to a rendered map.
//!
//! Rendering and data access stay behind traits:
//! - [`MapSurface`] renders polygon layers and a single positioned popup.
//! - [`EntityRepository`] fetches entity records, geometry and the root index.
//! - [`ChildLoader`] delivers lazily materialized children, either in the same
//!   call ([`BlockingLoader`]) or later from a background worker.

pub mod controller;
pub mod detail;
pub mod entity;
pub mod hierarchy;
pub mod registry;
pub mod repository;
pub mod session;
pub mod surface;
pub mod visibility;

pub use controller::{ControllerError, InteractionController, MapEvent};
pub use detail::{DetailOptions, DetailPopup, Gauge, GaugeColor};
pub use entity::{EmissionRecord, Entity, EntityId, Feature, FeatureCollection, LatLng};
pub use hierarchy::{HierarchyError, HierarchyIndex, nearest_root_ancestor};
pub use registry::{ChildrenState, LayerEntry, LayerHandle, LayerRegistry, RegistryError};
pub use repository::{
    BlockingLoader, ChildLoader, EntityRepository, LoadOutcome, LoadRequest, LoadedEntity,
    RepositoryError, load_entity,
};
pub use session::Session;
pub use surface::{MapSurface, PopupContent};
pub use visibility::{Cascade, DisplayMode, EventKind, Paint, PopupEffect, Transition, transition};

//! Applies the visibility state machine to pointer events on rendered layers.
//!
//! The controller owns the registry and the session. Every call runs to
//! completion before the next one, which is the only ordering guarantee the
//! registry relies on.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    detail::{DetailOptions, DetailPopup},
    entity::{EntityId, LatLng},
    hierarchy::HierarchyError,
    registry::{ChildrenState, LayerEntry, LayerHandle, LayerRegistry, RegistryError},
    repository::{ChildLoader, LoadOutcome, LoadRequest, LoadedEntity},
    session::Session,
    surface::{MapSurface, PopupContent},
    visibility::{Cascade, DisplayMode, EventKind, PopupEffect, transition},
};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error("no record loaded for entity {0}")]
    MissingRecord(EntityId),
}

/// Pointer event on the layer of `entity`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEvent {
    pub kind: EventKind,
    pub entity: EntityId,
    #[serde(default)]
    pub at: LatLng,
}

impl MapEvent {
    pub fn new(kind: EventKind, entity: impl Into<EntityId>, at: LatLng) -> Self {
        Self {
            kind,
            entity: entity.into(),
            at,
        }
    }
}

pub struct InteractionController<S, L> {
    surface: S,
    loader: L,
    registry: LayerRegistry,
    session: Session,
    options: DetailOptions,
    /// Children requested from the loader and not yet delivered.
    in_flight: HashSet<EntityId>,
    /// Outstanding child count per materializing parent.
    outstanding: HashMap<EntityId, usize>,
}

impl<S: MapSurface, L: ChildLoader> InteractionController<S, L> {
    pub fn new(
        surface: S,
        loader: L,
        roots: impl IntoIterator<Item = EntityId>,
        options: DetailOptions,
    ) -> Self {
        Self {
            surface,
            loader,
            registry: LayerRegistry::new(),
            session: Session::new(roots),
            options,
            in_flight: HashSet::new(),
            outstanding: HashMap::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_locked(&self) -> bool {
        self.session.is_locked()
    }

    pub fn mode_of(&self, id: &EntityId) -> Result<DisplayMode, RegistryError> {
        self.registry.mode(id)
    }

    /// Whether `id` has been requested from the loader and not yet delivered.
    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id)
    }

    /// Render an entity of the root set. It starts idle unless a loaded record
    /// already lists it as a child.
    pub fn render_root(
        &mut self,
        loaded: LoadedEntity,
    ) -> Result<Option<LayerHandle>, ControllerError> {
        let mode = if self.session.hierarchy().is_known_child(&loaded.entity.id) {
            DisplayMode::ChildHidden
        } else {
            DisplayMode::ParentIdle
        };
        self.install(loaded, mode)
    }

    /// Drain loader outcomes into the registry; returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let outcomes = self.loader.poll();
        let count = outcomes.len();
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
        count
    }

    pub fn handle(&mut self, event: &MapEvent) -> Result<DisplayMode, ControllerError> {
        let span = tracing::debug_span!(
            "controller.event",
            kind = event.kind.label(),
            entity = %event.entity
        );
        let _guard = span.enter();

        self.pump();
        let entry = *self.registry.get(&event.entity)?;
        let step = transition(entry.mode, event.kind, self.session.is_locked());

        let detail = if step.toggles_lock {
            Some(self.session.detail(&event.entity, &self.options)?.clone())
        } else {
            None
        };

        if step.cascade == Some(Cascade::Reveal) {
            self.materialize(&event.entity)?;
        }
        let current = *self.registry.get(&event.entity)?;
        self.apply_mode(&event.entity, current, step.mode)?;
        if let Some(cascade) = step.cascade {
            self.cascade(&event.entity, cascade)?;
        }
        if step.toggles_lock {
            let locked = self.session.toggle_lock();
            debug!(locked, "lock toggled");
        }
        self.apply_popup(&event.entity, entry.layer, step.popup, detail, event.at);

        Ok(step.mode)
    }

    /// Click on the bare map: toggles the lock and closes an unpinned popup.
    pub fn handle_map_click(&mut self) -> bool {
        self.pump();
        let locked = self.session.toggle_lock();
        if !locked {
            self.surface.close_popup();
        }
        locked
    }

    fn install(
        &mut self,
        loaded: LoadedEntity,
        mode: DisplayMode,
    ) -> Result<Option<LayerHandle>, ControllerError> {
        let LoadedEntity { entity, geometry } = loaded;
        if self.registry.contains(&entity.id) {
            debug!("{} already rendered; skipping", entity.id);
            return Ok(None);
        }
        if geometry.is_empty() {
            warn!("{} has no geometry features; not rendering", entity.id);
            self.session.remember(entity);
            return Ok(None);
        }

        let paint = mode.paint();
        let layer = self.surface.add_layer(&entity, &geometry, paint);
        if paint.bring_to_front {
            self.surface.bring_to_front(layer);
        }
        let id = entity.id.clone();
        let children = entity.subentities.clone();
        self.session.remember(entity);
        self.registry.register(id.clone(), layer, mode)?;
        info!(entity = %id, mode = mode.label(), "layer rendered");

        self.reconcile(&id)?;
        for child in children {
            if self.registry.contains(&child) {
                self.reconcile(&child)?;
            }
        }
        Ok(Some(layer))
    }

    /// Request every direct child that is neither rendered nor in flight.
    /// Runs at most once per parent.
    fn materialize(&mut self, parent: &EntityId) -> Result<(), ControllerError> {
        if self.registry.get(parent)?.children != ChildrenState::Unloaded {
            return Ok(());
        }

        let mut requested = 0;
        for child in self.session.subentities(parent) {
            if self.registry.contains(&child) || self.in_flight.contains(&child) {
                continue;
            }
            self.session.adopt(&child, parent);
            self.in_flight.insert(child.clone());
            self.loader.request(LoadRequest {
                parent: parent.clone(),
                child,
            });
            requested += 1;
        }

        if requested == 0 {
            self.registry.set_children(parent, ChildrenState::Loaded)?;
        } else {
            debug!(%parent, requested, "materializing children");
            self.registry.set_children(parent, ChildrenState::Loading)?;
            self.outstanding.insert(parent.clone(), requested);
        }

        self.pump();
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        let LoadOutcome {
            parent,
            child,
            result,
        } = outcome;
        self.in_flight.remove(&child);

        match result {
            Ok(loaded) => {
                if loaded.entity.id != child {
                    warn!("requested {child} but received {}", loaded.entity.id);
                }
                if let Err(err) = self.install(loaded, DisplayMode::ChildHidden) {
                    warn!("failed to render child {child} of {parent}: {err}");
                }
            }
            Err(err) => warn!("failed to load child {child} of {parent}: {err}"),
        }

        if let Some(remaining) = self.outstanding.get_mut(&parent) {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                self.outstanding.remove(&parent);
                if let Err(err) = self.registry.set_children(&parent, ChildrenState::Loaded) {
                    warn!("finished loading children of unrendered {parent}: {err}");
                }
            }
        }
    }

    /// Align a child's mode with the selection of the rendered parents that
    /// list it. Any selected parent keeps it revealed.
    fn reconcile(&mut self, id: &EntityId) -> Result<(), ControllerError> {
        let modes: Vec<DisplayMode> = self
            .session
            .listing_parents(id)
            .filter_map(|parent| self.registry.mode(parent).ok())
            .collect();
        if modes.is_empty() {
            return Ok(());
        }
        let selected = modes.contains(&DisplayMode::ParentSelected);
        let entry = *self.registry.get(id)?;
        let target = match (selected, entry.mode) {
            (
                true,
                DisplayMode::ChildHidden | DisplayMode::ParentIdle | DisplayMode::ParentHover,
            ) => DisplayMode::ChildVisibleIdle,
            (true, current) => current,
            (
                false,
                DisplayMode::ParentIdle
                | DisplayMode::ParentHover
                | DisplayMode::ChildVisibleIdle
                | DisplayMode::ChildVisibleHover,
            ) => DisplayMode::ChildHidden,
            (false, current) => current,
        };
        self.apply_mode(id, entry, target)
    }

    fn held_by_selected_parent(&self, id: &EntityId) -> bool {
        self.session
            .listing_parents(id)
            .any(|parent| self.registry.mode(parent) == Ok(DisplayMode::ParentSelected))
    }

    fn cascade(&mut self, parent: &EntityId, cascade: Cascade) -> Result<(), ControllerError> {
        let mode = cascade.child_mode();
        for child in self.session.subentities(parent) {
            let Ok(entry) = self.registry.get(&child).copied() else {
                continue;
            };
            if cascade == Cascade::Hide && self.held_by_selected_parent(&child) {
                continue;
            }
            self.apply_mode(&child, entry, mode)?;
        }
        Ok(())
    }

    fn apply_mode(
        &mut self,
        id: &EntityId,
        entry: LayerEntry,
        mode: DisplayMode,
    ) -> Result<(), ControllerError> {
        if entry.mode == mode {
            return Ok(());
        }
        self.registry.set_mode(id, mode)?;
        let paint = mode.paint();
        self.surface.set_paint(entry.layer, paint);
        if paint.bring_to_front {
            self.surface.bring_to_front(entry.layer);
        }
        Ok(())
    }

    fn apply_popup(
        &mut self,
        id: &EntityId,
        layer: LayerHandle,
        effect: PopupEffect,
        detail: Option<DetailPopup>,
        at: LatLng,
    ) {
        match effect {
            PopupEffect::Keep => {}
            PopupEffect::ShowName => {
                let name = self
                    .session
                    .entity(id)
                    .map(|entity| entity.display_name().to_string())
                    .unwrap_or_else(|| id.to_string());
                self.surface.open_popup(layer, &PopupContent::Name(name), at);
            }
            PopupEffect::ShowDetail => match detail {
                Some(detail) => {
                    self.surface.close_popup();
                    self.surface.open_popup(layer, &PopupContent::Detail(detail), at);
                }
                None => warn!("no detail popup prepared for {id}"),
            },
            PopupEffect::Follow => self.surface.move_popup(at),
            PopupEffect::Hide => self.surface.close_popup(),
        }
    }
}

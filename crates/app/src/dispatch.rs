//! Routes browser and script events into the controller.

use anyhow::{Context, Result, anyhow};
use map_core::{EntityId, EventKind, LatLng, MapEvent};
use metrics::counter;
use serde::Deserialize;
use tracing::debug;

use crate::{bootstrap::MapController, commands::RenderCommand, telemetry::EVENTS_TOTAL};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEventKind {
    Click,
    HoverEnter,
    HoverLeave,
    PointerMove,
    /// Click on the base map outside every layer.
    MapClick,
}

impl ClientEventKind {
    fn layer_event(self) -> Option<EventKind> {
        match self {
            ClientEventKind::Click => Some(EventKind::Click),
            ClientEventKind::HoverEnter => Some(EventKind::HoverEnter),
            ClientEventKind::HoverLeave => Some(EventKind::HoverLeave),
            ClientEventKind::PointerMove => Some(EventKind::PointerMove),
            ClientEventKind::MapClick => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self.layer_event() {
            Some(kind) => kind.label(),
            None => "map_click",
        }
    }
}

/// Event as posted by the page script or read from a replay script.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ClientEvent {
    /// Position in the page's event stream, counted from 1.
    #[serde(default)]
    pub seq: Option<u64>,
    pub kind: ClientEventKind,
    #[serde(default)]
    pub entity: Option<EntityId>,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

/// Apply one event and return the render commands queued so far.
pub fn dispatch(controller: &mut MapController, event: ClientEvent) -> Result<Vec<RenderCommand>> {
    counter!(EVENTS_TOTAL, "kind" => event.kind.label()).increment(1);
    let at = LatLng::new(event.lat, event.lng);

    match event.kind.layer_event() {
        None => {
            let locked = controller.handle_map_click();
            debug!(locked, "map background clicked");
        }
        Some(kind) => {
            let entity = event
                .entity
                .ok_or_else(|| anyhow!("{} event without an entity", event.kind.label()))?;
            controller
                .handle(&MapEvent::new(kind, entity.clone(), at))
                .with_context(|| format!("{} on {entity} rejected", kind.label()))?;
        }
    }

    Ok(controller.surface_mut().drain())
}

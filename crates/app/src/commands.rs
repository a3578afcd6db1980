//! Render command protocol between the controller and the page script.
//!
//! [`CommandBuffer`] is the server-side [`MapSurface`]: every surface call is
//! queued as a [`RenderCommand`] for the browser to apply, and the current
//! layer set is mirrored so a reloaded page can be rebuilt from a snapshot.

use std::collections::HashMap;

use map_core::{
    Entity, EntityId, FeatureCollection, LatLng, LayerHandle, MapSurface, Paint, PopupContent,
};
use metrics::counter;
use serde::Serialize;

use crate::{html::fragments, telemetry::LAYERS_RENDERED_TOTAL};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderCommand {
    AddLayer {
        layer: LayerHandle,
        entity: EntityId,
        geometry: FeatureCollection,
        paint: Paint,
    },
    SetPaint {
        layer: LayerHandle,
        paint: Paint,
    },
    BringToFront {
        layer: LayerHandle,
    },
    OpenPopup {
        layer: LayerHandle,
        html: String,
        at: LatLng,
    },
    MovePopup {
        at: LatLng,
    },
    ClosePopup,
}

#[derive(Debug)]
struct LayerState {
    entity: EntityId,
    geometry: FeatureCollection,
    paint: Paint,
}

#[derive(Debug, Default)]
pub struct CommandBuffer {
    next_layer: u64,
    pending: Vec<RenderCommand>,
    layers: HashMap<LayerHandle, LayerState>,
    /// Back-to-front stacking order.
    order: Vec<LayerHandle>,
}

impl CommandBuffer {
    /// Take every command queued since the last drain.
    pub fn drain(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Commands that rebuild the current layer set from scratch, back to front.
    /// Queued commands are discarded since the snapshot already reflects them.
    pub fn snapshot(&mut self) -> Vec<RenderCommand> {
        self.pending.clear();
        self.order
            .iter()
            .filter_map(|handle| {
                self.layers.get(handle).map(|state| RenderCommand::AddLayer {
                    layer: *handle,
                    entity: state.entity.clone(),
                    geometry: state.geometry.clone(),
                    paint: state.paint,
                })
            })
            .collect()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl MapSurface for CommandBuffer {
    fn add_layer(
        &mut self,
        entity: &Entity,
        geometry: &FeatureCollection,
        paint: Paint,
    ) -> LayerHandle {
        let layer = LayerHandle(self.next_layer);
        self.next_layer += 1;
        counter!(LAYERS_RENDERED_TOTAL).increment(1);

        self.layers.insert(
            layer,
            LayerState {
                entity: entity.id.clone(),
                geometry: geometry.clone(),
                paint,
            },
        );
        self.order.push(layer);
        self.pending.push(RenderCommand::AddLayer {
            layer,
            entity: entity.id.clone(),
            geometry: geometry.clone(),
            paint,
        });
        layer
    }

    fn set_paint(&mut self, layer: LayerHandle, paint: Paint) {
        if let Some(state) = self.layers.get_mut(&layer) {
            state.paint = paint;
        }
        self.pending.push(RenderCommand::SetPaint { layer, paint });
    }

    fn bring_to_front(&mut self, layer: LayerHandle) {
        if let Some(position) = self.order.iter().position(|handle| *handle == layer) {
            let handle = self.order.remove(position);
            self.order.push(handle);
        }
        self.pending.push(RenderCommand::BringToFront { layer });
    }

    fn open_popup(&mut self, layer: LayerHandle, content: &PopupContent, at: LatLng) {
        self.pending.push(RenderCommand::OpenPopup {
            layer,
            html: fragments::popup_html(content),
            at,
        });
    }

    fn move_popup(&mut self, at: LatLng) {
        self.pending.push(RenderCommand::MovePopup { at });
    }

    fn close_popup(&mut self) {
        self.pending.push(RenderCommand::ClosePopup);
    }
}

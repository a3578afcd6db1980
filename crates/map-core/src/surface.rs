use crate::{
    detail::DetailPopup,
    entity::{Entity, FeatureCollection, LatLng},
    registry::LayerHandle,
    visibility::Paint,
};

/// Content of the single map popup.
#[derive(Clone, Debug, PartialEq)]
pub enum PopupContent {
    Name(String),
    Detail(DetailPopup),
}

/// Rendering capability of the base map.
///
/// A surface owns one popup at a time; opening it again replaces the previous
/// content and position.
pub trait MapSurface {
    fn add_layer(
        &mut self,
        entity: &Entity,
        geometry: &FeatureCollection,
        paint: Paint,
    ) -> LayerHandle;

    fn set_paint(&mut self, layer: LayerHandle, paint: Paint);

    fn bring_to_front(&mut self, layer: LayerHandle);

    fn open_popup(&mut self, layer: LayerHandle, content: &PopupContent, at: LatLng);

    fn move_popup(&mut self, at: LatLng);

    fn close_popup(&mut self);
}

//! Reporting entity records and the GeoJSON shapes they are drawn from.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Dot-delimited hierarchical identifier, e.g. `uk.ac.cam.kings.chapel`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier with the last dot-segment removed, `None` for a single segment.
    pub fn parent(&self) -> Option<EntityId> {
        self.0
            .rsplit_once('.')
            .map(|(head, _)| EntityId(head.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A reporting unit as published under `/reporting_entities/<id>.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subentities: Vec<EntityId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emissions: Vec<EmissionRecord>,
    /// Path of the geometry document relative to the data root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geojson: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_entity: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            subentities: Vec::new(),
            emissions: Vec::new(),
            geojson: None,
            osm_entity: None,
        }
    }

    pub fn with_subentities<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.subentities = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_emission(mut self, kind: impl Into<String>, value: f64) -> Self {
        self.emissions.push(EmissionRecord::new(kind, value));
        self
    }

    /// Name shown in popups; records without a name fall back to their id.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.id.as_str(),
        }
    }
}

/// One reading attached to an entity, in publication order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionRecord {
    #[serde(alias = "measure")]
    pub kind: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kgco2e: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2e_calculation: Option<serde_json::Value>,
}

impl EmissionRecord {
    pub fn new(kind: impl Into<String>, value: f64) -> Self {
        Self {
            kind: kind.into(),
            value,
            unit: None,
            period_start: None,
            period_end: None,
            kgco2e: None,
            co2e_calculation: None,
        }
    }
}

/// GeoJSON `FeatureCollection`; geometries are passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_tag")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: feature_collection_tag(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_tag")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub geometry: serde_json::Value,
}

impl Feature {
    pub fn new(geometry: serde_json::Value) -> Self {
        Self {
            kind: feature_tag(),
            properties: serde_json::Map::new(),
            geometry,
        }
    }
}

/// Geographic position of a pointer event or popup anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

fn feature_collection_tag() -> String {
    "FeatureCollection".to_string()
}

fn feature_tag() -> String {
    "Feature".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_strips_one_segment() {
        let id = EntityId::from("uk.ac.cam.kings.chapel");
        assert_eq!(id.parent(), Some(EntityId::from("uk.ac.cam.kings")));
        assert_eq!(EntityId::from("uk").parent(), None);
        assert_eq!(
            EntityId::from("uk.ac.cam").parent().and_then(|id| id.parent()),
            Some(EntityId::from("uk"))
        );
    }

    #[test]
    fn decodes_published_entity_record() {
        let json = r#"{
            "id": "uk.ac.cam.kings",
            "name": "King's College",
            "osmEntity": "way/123",
            "geojson": "/geojson/uk.ac.cam.kings.geojson",
            "subentities": ["uk.ac.cam.kings.chapel"],
            "emissions": [
                {"periodStart": "2019-01-01T00:00:00", "periodEnd": "2019-12-31T00:00:00",
                 "measure": "gas", "unit": "kWh", "value": 4.5, "kgco2e": 0.83,
                 "co2eCalculation": 7}
            ]
        }"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.display_name(), "King's College");
        assert_eq!(entity.subentities, vec![EntityId::from("uk.ac.cam.kings.chapel")]);
        assert_eq!(entity.emissions[0].kind, "gas");
        assert_eq!(entity.emissions[0].unit.as_deref(), Some("kWh"));
        assert_eq!(entity.geojson.as_deref(), Some("/geojson/uk.ac.cam.kings.geojson"));
    }

    #[test]
    fn sparse_record_uses_defaults() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": "X", "name": null, "subentities": null}"#).unwrap();
        assert_eq!(entity.display_name(), "X");
        assert!(entity.subentities.is_empty());
        assert!(entity.emissions.is_empty());
    }

    #[test]
    fn decodes_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"id": "X", "name": "Ex"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}
            }]
        }"#;
        let collection: FeatureCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].properties["name"], "Ex");
        assert!(!collection.is_empty());
    }
}

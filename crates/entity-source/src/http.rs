//! Blocking HTTP repository over the published carbon map data bucket.

use std::time::Duration;

use map_core::{Entity, EntityId, EntityRepository, FeatureCollection, RepositoryError};
use reqwest::{StatusCode, blocking::Client};
use serde::de::DeserializeOwned;
use serde_json::from_str;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DATA_ROOT: &str = "https://data.cambridgecarbonmap.org";
pub const DEFAULT_INDEX_PATH: &str = "/reporting_entities/index.json";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
    #[error("data root {0:?} is not an http(s) URL")]
    DataRoot(String),
}

/// URL layout of the data bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    data_root: String,
    index_path: String,
}

impl Endpoints {
    pub fn new(data_root: &str) -> Result<Self, SourceError> {
        let data_root = data_root.trim().trim_end_matches('/');
        if !(data_root.starts_with("http://") || data_root.starts_with("https://")) {
            return Err(SourceError::DataRoot(data_root.to_string()));
        }
        Ok(Self {
            data_root: data_root.to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
        })
    }

    /// Read the root list from another path, e.g. the bare `/reporting_entities/` listing.
    pub fn with_index_path(mut self, path: &str) -> Self {
        self.index_path = path.to_string();
        self
    }

    pub fn index_url(&self) -> String {
        self.resolve(&self.index_path)
    }

    pub fn entity_url(&self, id: &EntityId) -> String {
        format!("{}/reporting_entities/{id}.json", self.data_root)
    }

    pub fn geometry_url(&self, id: &EntityId) -> String {
        format!("{}/geojson/{id}.geojson", self.data_root)
    }

    /// Absolute URL for a path published inside a record.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.data_root)
        } else {
            format!("{}/{path}", self.data_root)
        }
    }
}

pub struct HttpEntityRepository {
    client: Client,
    endpoints: Endpoints,
}

impl HttpEntityRepository {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RepositoryError> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| network(url, err))?;
        classify_status(url, response.status())?;
        let body = response.text().map_err(|err| network(url, err))?;
        decode(url, &body)
    }
}

impl EntityRepository for HttpEntityRepository {
    fn fetch_index(&self) -> Result<Vec<EntityId>, RepositoryError> {
        self.get_json(&self.endpoints.index_url())
    }

    fn fetch_entity(&self, id: &EntityId) -> Result<Entity, RepositoryError> {
        self.get_json(&self.endpoints.entity_url(id))
    }

    fn fetch_geometry(&self, id: &EntityId) -> Result<FeatureCollection, RepositoryError> {
        self.get_json(&self.endpoints.geometry_url(id))
    }

    fn fetch_geometry_for(&self, entity: &Entity) -> Result<FeatureCollection, RepositoryError> {
        match entity.geojson.as_deref() {
            Some(path) if !path.trim().is_empty() => {
                self.get_json(&self.endpoints.resolve(path))
            }
            _ => self.fetch_geometry(&entity.id),
        }
    }
}

/// Map a response status onto the repository error kinds. The bucket answers
/// 403 rather than 404 for keys that do not exist.
pub fn classify_status(target: &str, status: StatusCode) -> Result<(), RepositoryError> {
    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        return Err(RepositoryError::NotFound {
            target: target.to_string(),
        });
    }
    if !status.is_success() {
        return Err(RepositoryError::Network {
            target: target.to_string(),
            message: format!("server responded with {status}"),
        });
    }
    Ok(())
}

pub fn decode<T: DeserializeOwned>(target: &str, body: &str) -> Result<T, RepositoryError> {
    from_str(body).map_err(|err| RepositoryError::Decode {
        target: target.to_string(),
        message: err.to_string(),
    })
}

fn network(target: &str, err: reqwest::Error) -> RepositoryError {
    RepositoryError::Network {
        target: target.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://data.example.org/").unwrap()
    }

    #[test]
    fn builds_bucket_urls() {
        let endpoints = endpoints();
        let id = EntityId::from("uk.ac.cam.kings");
        assert_eq!(
            endpoints.entity_url(&id),
            "https://data.example.org/reporting_entities/uk.ac.cam.kings.json"
        );
        assert_eq!(
            endpoints.geometry_url(&id),
            "https://data.example.org/geojson/uk.ac.cam.kings.geojson"
        );
        assert_eq!(
            endpoints.index_url(),
            "https://data.example.org/reporting_entities/index.json"
        );
    }

    #[test]
    fn resolves_record_paths() {
        let endpoints = endpoints();
        assert_eq!(
            endpoints.resolve("/geojson/a.geojson"),
            "https://data.example.org/geojson/a.geojson"
        );
        assert_eq!(
            endpoints.resolve("geojson/a.geojson"),
            "https://data.example.org/geojson/a.geojson"
        );
        assert_eq!(
            endpoints.resolve("https://cdn.example.org/a.geojson"),
            "https://cdn.example.org/a.geojson"
        );
        assert_eq!(
            endpoints.with_index_path("/reporting_entities/").index_url(),
            "https://data.example.org/reporting_entities/"
        );
    }

    #[test]
    fn rejects_non_http_root() {
        assert!(matches!(
            Endpoints::new("data.example.org"),
            Err(SourceError::DataRoot(_))
        ));
    }

    #[test]
    fn classifies_statuses() {
        assert!(classify_status("u", StatusCode::OK).is_ok());
        assert!(matches!(
            classify_status("u", StatusCode::NOT_FOUND),
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            classify_status("u", StatusCode::FORBIDDEN),
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            classify_status("u", StatusCode::BAD_GATEWAY),
            Err(RepositoryError::Network { .. })
        ));
    }

    #[test]
    fn decodes_index_and_reports_bad_bodies() {
        let index: Vec<EntityId> =
            decode("index", r#"["uk.ac.cam.kings", "uk.ac.cam.st-edmunds"]"#).unwrap();
        assert_eq!(index.len(), 2);

        let err = decode::<Entity>("entity", "<html>").unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));
    }
}

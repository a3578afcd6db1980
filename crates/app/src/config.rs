//! Runtime configuration.
//!
//! Defaults come from `CARBON_MAP_*` environment variables, falling back to the
//! Cambridge viewport and the public data bucket. CLI flags override both and
//! the merged result is validated once in `TryFrom<MapArgs>`.

use std::{env, str::FromStr, time::Duration};

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use entity_source::{DEFAULT_DATA_ROOT, DEFAULT_INDEX_PATH};
use map_core::{DetailOptions, EntityId, LatLng};
use serde::Serialize;

pub const DEFAULT_CENTER: LatLng = LatLng::new(52.205, 0.1218);
pub const DEFAULT_ZOOM: f64 = 12.5;
pub const DEFAULT_CONTAINER: &str = "mainMap";
pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
const MAX_ZOOM: f64 = 22.0;

/// Where the set of top-level entities comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexSource {
    /// The published root index under the data root.
    Remote,
    /// Fixed list given with `--root`.
    Static(Vec<EntityId>),
}

/// How lazily materialized children are fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LoaderMode {
    /// Fetch inside the event that revealed them.
    Blocking,
    /// Fetch on worker threads; results are picked up on the next event or poll.
    Background,
}

/// Initial map view handed to the page script.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: f64,
    pub container: String,
    pub tile_url: String,
    pub attribution: String,
}

#[derive(Clone, Debug)]
pub struct MapConfig {
    pub data_root: String,
    pub index_path: String,
    pub index: IndexSource,
    pub loader: LoaderMode,
    pub fetch_workers: usize,
    pub viewport: Viewport,
    pub bind: String,
    pub port: u16,
    pub timeout: Duration,
    pub detail: DetailOptions,
}

fn env_or<T: FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

impl Default for MapConfig {
    fn default() -> Self {
        let viewport = Viewport {
            center: LatLng::new(
                env_or("CARBON_MAP_LAT", DEFAULT_CENTER.lat),
                env_or("CARBON_MAP_LON", DEFAULT_CENTER.lng),
            ),
            zoom: env_or("CARBON_MAP_ZOOM", DEFAULT_ZOOM),
            container: DEFAULT_CONTAINER.to_string(),
            tile_url: env_or("CARBON_MAP_TILE_URL", DEFAULT_TILE_URL.to_string()),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
        };

        Self {
            data_root: env_or("CARBON_MAP_DATA_ROOT", DEFAULT_DATA_ROOT.to_string()),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            index: IndexSource::Remote,
            loader: LoaderMode::Background,
            fetch_workers: 4,
            viewport,
            bind: env_or("CARBON_MAP_BIND", "0.0.0.0".to_string()),
            port: env_or("CARBON_MAP_PORT", 8080),
            timeout: Duration::from_secs(10),
            detail: DetailOptions::default(),
        }
    }
}

impl MapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_root.trim().is_empty() {
            bail!("--data-root must not be empty");
        }
        let LatLng { lat, lng } = self.viewport.center;
        if !(-90.0..=90.0).contains(&lat) {
            bail!("--lat must be between -90 and 90, got {lat}");
        }
        if !(-180.0..=180.0).contains(&lng) {
            bail!("--lon must be between -180 and 180, got {lng}");
        }
        if !(0.0..=MAX_ZOOM).contains(&self.viewport.zoom) {
            bail!("--zoom must be between 0 and {MAX_ZOOM}, got {}", self.viewport.zoom);
        }
        if self.viewport.container.trim().is_empty() {
            bail!("--container must not be empty");
        }
        if self.timeout.is_zero() {
            bail!("--timeout-secs must be at least 1");
        }
        if self.fetch_workers == 0 {
            bail!("--fetch-workers must be at least 1");
        }
        if !(self.detail.gauge_max.is_finite() && self.detail.gauge_max > 0.0) {
            bail!("--gauge-max must be a positive number");
        }
        if let IndexSource::Static(roots) = &self.index {
            if roots.iter().any(|root| root.as_str().trim().is_empty()) {
                bail!("--root values must not be empty");
            }
        }
        Ok(())
    }
}

/// Map options shared by `serve` and `replay`.
#[derive(Debug, Default, Args)]
pub struct MapArgs {
    /// Base URL of the published entity data.
    #[arg(long = "data-root", value_name = "URL")]
    pub data_root: Option<String>,
    /// Path of the root index below the data root.
    #[arg(long = "index-path", value_name = "PATH")]
    pub index_path: Option<String>,
    /// Top-level entity to show instead of the published index; repeatable.
    #[arg(long = "root", value_name = "ID")]
    pub roots: Vec<String>,
    /// How children are fetched when a parent is selected.
    #[arg(long = "loader", value_enum, value_name = "MODE")]
    pub loader: Option<LoaderMode>,
    /// Worker threads used by the background loader.
    #[arg(long = "fetch-workers", value_name = "N")]
    pub fetch_workers: Option<usize>,
    /// Initial latitude.
    #[arg(long = "lat", value_name = "DEG", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Initial longitude.
    #[arg(long = "lon", value_name = "DEG", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Initial zoom level.
    #[arg(long = "zoom", value_name = "LEVEL")]
    pub zoom: Option<f64>,
    /// DOM id of the map container.
    #[arg(long = "container", value_name = "ID")]
    pub container: Option<String>,
    /// Tile URL template for the base map.
    #[arg(long = "tile-url", value_name = "TEMPLATE")]
    pub tile_url: Option<String>,
    /// Address to bind the HTTP server to.
    #[arg(long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,
    /// Port to bind the HTTP server to.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,
    /// Timeout for each data request.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,
    /// Upper bound of the emissions gauges.
    #[arg(long = "gauge-max", value_name = "VALUE")]
    pub gauge_max: Option<f64>,
    /// Link shown in the detail popup.
    #[arg(long = "contact-link", value_name = "URL")]
    pub contact_link: Option<String>,
}

impl TryFrom<MapArgs> for MapConfig {
    type Error = anyhow::Error;

    fn try_from(args: MapArgs) -> Result<Self> {
        let mut config = MapConfig::default();

        if let Some(data_root) = args.data_root {
            config.data_root = data_root;
        }
        if let Some(index_path) = args.index_path {
            config.index_path = index_path;
        }
        if !args.roots.is_empty() {
            config.index =
                IndexSource::Static(args.roots.into_iter().map(EntityId::from).collect());
        }
        if let Some(loader) = args.loader {
            config.loader = loader;
        }
        if let Some(workers) = args.fetch_workers {
            config.fetch_workers = workers;
        }
        if let Some(lat) = args.lat {
            config.viewport.center.lat = lat;
        }
        if let Some(lon) = args.lon {
            config.viewport.center.lng = lon;
        }
        if let Some(zoom) = args.zoom {
            config.viewport.zoom = zoom;
        }
        if let Some(container) = args.container {
            config.viewport.container = container;
        }
        if let Some(tile_url) = args.tile_url {
            config.viewport.tile_url = tile_url;
        }
        if let Some(bind) = args.bind {
            config.bind = bind;
        }
        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(secs) = args.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(gauge_max) = args.gauge_max {
            config.detail.gauge_max = gauge_max;
        }
        if let Some(link) = args.contact_link {
            config.detail.contact_link = link;
        }

        config.validate()?;
        Ok(config)
    }
}

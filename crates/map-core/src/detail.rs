//! Detail popup shown when an entity is clicked: a link to the project page
//! and one radial gauge per emissions reading of the nearest root entity.

use serde::Serialize;

use crate::entity::{Entity, EntityId};

pub const DEFAULT_GAUGE_MAX: f64 = 10.0;
pub const DEFAULT_CONTACT_LINK: &str = "http://cambridgecarbonmap.org/";
const COMING_SOON: &str = "Emissions data is coming soon! Click here if you want to hear more \
from us, or get involved with the project - we'd love to have you on board";

#[derive(Clone, Debug, PartialEq)]
pub struct DetailOptions {
    /// Upper bound of every gauge.
    pub gauge_max: f64,
    pub contact_link: String,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            gauge_max: DEFAULT_GAUGE_MAX,
            contact_link: DEFAULT_CONTACT_LINK.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GaugeColor {
    Orange,
    Blue,
    Grey,
}

impl GaugeColor {
    fn for_kind(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "gas" => GaugeColor::Orange,
            "electricity" | "elec" => GaugeColor::Blue,
            _ => GaugeColor::Grey,
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            GaugeColor::Orange => "orange",
            GaugeColor::Blue => "blue",
            GaugeColor::Grey => "grey",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Gauge {
    pub label: String,
    pub kind: String,
    pub value: f64,
    pub max: f64,
    pub color: GaugeColor,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetailPopup {
    pub entity: EntityId,
    /// Entity whose figures are shown; the nearest root ancestor.
    pub source: EntityId,
    pub own: bool,
    pub headline: String,
    pub link: String,
    pub gauges: Vec<Gauge>,
}

impl DetailPopup {
    pub fn build(entity: &Entity, source: &Entity, options: &DetailOptions) -> Self {
        let own = entity.id == source.id;
        let name = source.display_name();
        let gauges: Vec<Gauge> = source
            .emissions
            .iter()
            .map(|record| Gauge {
                label: format!("{name} {} Usage", capitalize(&record.kind)),
                kind: record.kind.clone(),
                value: record.value,
                max: options.gauge_max,
                color: GaugeColor::for_kind(&record.kind),
            })
            .collect();

        let headline = if gauges.is_empty() {
            COMING_SOON.to_string()
        } else if own {
            format!("Emissions for {name}:")
        } else {
            format!("No stats for this building individually! Emissions for {name}:")
        };

        Self {
            entity: entity.id.clone(),
            source: source.id.clone(),
            own,
            headline,
            link: options.contact_link.clone(),
            gauges,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

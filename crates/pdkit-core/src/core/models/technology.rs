use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database units per micron assumed when a technology file carries no `UNITS` section.
pub const DEFAULT_DBU_PER_MICRON: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Routing,
    Cut,
    Masterslice,
    Overlap,
    Implant,
    Other,
}

impl FromStr for LayerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "ROUTING" => LayerKind::Routing,
            "CUT" => LayerKind::Cut,
            "MASTERSLICE" => LayerKind::Masterslice,
            "OVERLAP" => LayerKind::Overlap,
            "IMPLANT" => LayerKind::Implant,
            _ => LayerKind::Other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingDirection {
    Horizontal,
    Vertical,
}

impl FromStr for RoutingDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HORIZONTAL" => Ok(RoutingDirection::Horizontal),
            "VERTICAL" => Ok(RoutingDirection::Vertical),
            _ => Err(()),
        }
    }
}

impl fmt::Display for RoutingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingDirection::Horizontal => write!(f, "HORIZONTAL"),
            RoutingDirection::Vertical => write!(f, "VERTICAL"),
        }
    }
}

/// A process layer. Dimensions are stored in database units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub direction: Option<RoutingDirection>,
    pub pitch: Option<i64>,
    pub width: Option<i64>,
}

/// A placement site. Dimensions are stored in database units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub class: Option<String>,
    pub width: i64,
    pub height: i64,
}

/// Process rules shared by every library loaded into the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub dbu_per_micron: u32,
    pub manufacturing_grid: Option<i64>,
    layers: IndexMap<String, Layer>,
    sites: IndexMap<String, Site>,
}

impl Technology {
    pub fn new(name: impl Into<String>, dbu_per_micron: u32) -> Self {
        Self {
            name: name.into(),
            dbu_per_micron,
            manufacturing_grid: None,
            layers: IndexMap::new(),
            sites: IndexMap::new(),
        }
    }

    /// Converts a length in microns to database units, rounding to the nearest unit.
    pub fn to_dbu(&self, microns: f64) -> i64 {
        (microns * f64::from(self.dbu_per_micron)).round() as i64
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.insert(layer.name.clone(), layer);
    }

    pub fn add_site(&mut self, site: Site) {
        self.sites.insert(site.name.clone(), site);
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn site(&self, name: &str) -> Option<&Site> {
        self.sites.get(name)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }

    pub fn routing_layer_count(&self) -> usize {
        self.layers
            .values()
            .filter(|l| l.kind == LayerKind::Routing)
            .count()
    }
}

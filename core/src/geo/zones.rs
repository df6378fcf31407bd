use log::warn;
use serde::{Deserialize, Serialize};

use crate::prelude::ZoneAlert;

/// Zone category and the priority it carries during arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneCategory {
    Unknown,
    Exterior,
    Perimeter,
    Interior,
    Module,
}

impl ZoneCategory {
    /// Case-insensitive, accepts the Spanish labels used by the admin console.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "exterior" => Self::Exterior,
            "perimeter" | "perimetro" | "perímetro" => Self::Perimeter,
            "interior" => Self::Interior,
            "module" | "modulo" | "módulo" => Self::Module,
            _ => Self::Unknown,
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Exterior => 1,
            Self::Perimeter => 2,
            Self::Interior => 3,
            Self::Module => 4,
        }
    }
}

/// Geofence polygon as stored by the configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub color: String,
    /// `[lat, lon]` vertices, either winding.
    #[serde(rename = "coordinates", alias = "polygon", default)]
    pub polygon: Vec<[f64; 2]>,
}

impl Zone {
    pub fn category(&self) -> ZoneCategory {
        ZoneCategory::parse(&self.category)
    }

    pub fn priority(&self) -> u8 {
        self.category().priority()
    }

    pub fn is_well_formed(&self) -> bool {
        self.polygon.len() >= 3
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.is_well_formed() && point_in_polygon((latitude, longitude), &self.polygon)
    }

    pub fn alert(&self) -> ZoneAlert {
        ZoneAlert {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            category: self.category.clone(),
        }
    }
}

/// Ray-casting containment test.
///
/// A horizontal ray is cast from `point`; edges count as crossed under the
/// half-open rule `y > min(y1, y2) && y <= max(y1, y2)` so a ray through a
/// shared vertex is counted once. A point sitting exactly on a vertex is
/// inside.
pub fn point_in_polygon(point: (f64, f64), polygon: &[[f64; 2]]) -> bool {
    let (x, y) = point;
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut previous = polygon[n - 1];
    for &current in polygon {
        let [x1, y1] = previous;
        let [x2, y2] = current;

        if x == x2 && y == y2 {
            return true;
        }

        if y > y1.min(y2) && y <= y1.max(y2) && x <= x1.max(x2) {
            // y1 != y2 here: the interval test above is empty for flat edges.
            let x_intersect = (y - y1) * (x2 - x1) / (y2 - y1) + x1;
            if x1 == x2 || x <= x_intersect {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

/// Highest-priority zone containing `point` (`(lat, lon)`).
///
/// Every zone is evaluated. A later zone replaces the current pick only with a
/// strictly greater priority, so ties keep iteration order. Polygons with
/// fewer than three vertices are skipped.
pub fn classify(point: (f64, f64), zones: &[Zone]) -> Option<&Zone> {
    let mut best: Option<&Zone> = None;
    for zone in zones {
        if !zone.contains(point.0, point.1) {
            continue;
        }
        match best {
            Some(current) if zone.priority() <= current.priority() => {}
            _ => best = Some(zone),
        }
    }
    best
}

/// Immutable set of zones used for one ingestion session.
#[derive(Debug, Clone, Default)]
pub struct ZoneIndex {
    zones: Vec<Zone>,
}

impl ZoneIndex {
    pub fn new(zones: Vec<Zone>) -> Self {
        let zones = zones
            .into_iter()
            .filter(|zone| {
                if !zone.is_well_formed() {
                    warn!(
                        "skipping zone {} ({}): polygon has {} vertices",
                        zone.id,
                        zone.name,
                        zone.polygon.len()
                    );
                }
                zone.is_well_formed()
            })
            .collect();
        Self { zones }
    }

    pub fn classify(&self, latitude: f64, longitude: f64) -> Option<&Zone> {
        classify((latitude, longitude), &self.zones)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

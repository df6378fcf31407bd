use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Detection as reported by the radar, in the radar's local Cartesian frame.
///
/// `id` and `kind` are opaque upstream values, forwarded to observers as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RadarPoint {
    pub id: Option<Value>,
    pub kind: Option<Value>,
    pub x_m: f64,
    pub y_m: f64,
    pub azimuth_deg: Option<f64>,
    pub slant_range_m: Option<f64>,
}

/// Detection placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<Value>,
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
    #[serde(rename = "azimut")]
    pub azimuth_deg: Option<f64>,
    #[serde(rename = "distancia")]
    pub slant_range_m: Option<f64>,
}

/// Zone summary attached to a detection that fell inside a geofence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAlert {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub category: String,
}

/// A located detection and the zone it was classified into, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedPoint {
    #[serde(flatten)]
    pub point: GeoPoint,
    #[serde(rename = "zona_alerta", skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneAlert>,
    #[serde(skip)]
    pub priority: u8,
}

/// One processed radar frame, as broadcast to observers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DetectionFrame {
    #[serde(rename = "puntos")]
    pub points: Vec<TrackedPoint>,
}

impl DetectionFrame {
    pub fn new(points: Vec<TrackedPoint>) -> Self {
        Self { points }
    }

    /// Highest-priority detection that matched a zone. Ties keep frame order.
    pub fn priority_target(&self) -> Option<&TrackedPoint> {
        let mut best: Option<&TrackedPoint> = None;
        for point in self.points.iter().filter(|p| p.zone.is_some()) {
            match best {
                Some(current) if point.priority <= current.priority => {}
                _ => best = Some(point),
            }
        }
        best
    }

    pub fn alert_count(&self) -> usize {
        self.points.iter().filter(|p| p.zone.is_some()).count()
    }
}

/// Normalized actuator command. Pan and tilt in `[-1, 1]`, zoom in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtzCommand {
    pub pan: f64,
    pub tilt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

/// Common error type for the core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("upstream transport: {0}")]
    Upstream(String),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("configuration unavailable: {0}")]
    Config(String),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("actuator dispatch failed: {0}")]
    Actuator(String),
    #[error("observer delivery failed: {0}")]
    Observer(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

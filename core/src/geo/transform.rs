//! Radar-frame Cartesian meters to geographic coordinates.
//!
//! The conversion is a local flat-earth approximation around the radar
//! origin: one degree of latitude is a fixed number of meters and a degree of
//! longitude shrinks with `cos(latitude)`. It is accurate for the radar's
//! working radius (hundreds of meters) and is not a geodesic projection.

use serde::{Deserialize, Serialize};

use crate::prelude::{CoreError, CoreResult, GeoPoint, RadarPoint};

/// Mean length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

fn default_meters_per_degree() -> f64 {
    METERS_PER_DEGREE_LAT
}

/// Surveyed placement of the radar head.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarCalibration {
    pub latitude: f64,
    pub longitude: f64,
    /// Detection range, used only for the coverage polygon.
    #[serde(default)]
    pub radius_m: f64,
    /// Counter-clockwise rotation aligning the radar's native axes with true north.
    #[serde(default)]
    pub rotation_deg: f64,
    #[serde(default = "default_meters_per_degree")]
    pub meters_per_degree_lat: f64,
}

impl RadarCalibration {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.latitude.is_finite() && self.latitude.abs() < 90.0) {
            return Err(CoreError::InvalidCalibration(format!(
                "radar latitude {} outside (-90, 90)",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() {
            return Err(CoreError::InvalidCalibration(
                "radar longitude is not finite".into(),
            ));
        }
        if !(self.meters_per_degree_lat.is_finite() && self.meters_per_degree_lat > 0.0) {
            return Err(CoreError::InvalidCalibration(format!(
                "meters per degree latitude must be positive, got {}",
                self.meters_per_degree_lat
            )));
        }
        Ok(())
    }

    /// Rotates a radar-frame offset into true-north axes and converts it.
    pub fn locate_xy(&self, x_m: f64, y_m: f64) -> (f64, f64) {
        let (x, y) = rotate(x_m, y_m, self.rotation_deg);
        to_geo(x, y, self.latitude, self.longitude, self.meters_per_degree_lat)
    }

    pub fn locate(&self, point: &RadarPoint) -> GeoPoint {
        let (latitude, longitude) = self.locate_xy(point.x_m, point.y_m);
        GeoPoint {
            id: point.id.clone(),
            kind: point.kind.clone(),
            latitude,
            longitude,
            azimuth_deg: point.azimuth_deg,
            slant_range_m: point.slant_range_m,
        }
    }
}

/// Converts an east/north offset in meters to latitude/longitude.
pub fn to_geo(
    x_m: f64,
    y_m: f64,
    radar_lat: f64,
    radar_lon: f64,
    meters_per_degree_lat: f64,
) -> (f64, f64) {
    let delta_lat = y_m / meters_per_degree_lat;
    let meters_per_degree_lon = meters_per_degree_lat * radar_lat.to_radians().cos();
    let delta_lon = x_m / meters_per_degree_lon;
    (radar_lat + delta_lat, radar_lon + delta_lon)
}

/// Rotates `(x, y)` counter-clockwise by `angle_deg`.
pub fn rotate(x: f64, y: f64, angle_deg: f64) -> (f64, f64) {
    let (sin_theta, cos_theta) = angle_deg.to_radians().sin_cos();
    (x * cos_theta - y * sin_theta, x * sin_theta + y * cos_theta)
}

/// Geographic corners of the radar's forward detection rectangle.
///
/// The rectangle spans `x` in `[-r, r]` and `y` in `[0, r]`; vertices come
/// back as `[lat, lon]` in the order top-right, top-left, bottom-left,
/// bottom-right.
pub fn coverage_polygon(radar: &RadarCalibration) -> Vec<[f64; 2]> {
    let r = radar.radius_m;
    [(r, r), (-r, r), (-r, 0.0), (r, 0.0)]
        .iter()
        .map(|&(x, y)| {
            let (lat, lon) = radar.locate_xy(x, y);
            [lat, lon]
        })
        .collect()
}

pub mod transform;
pub mod zones;

pub use transform::{coverage_polygon, rotate, to_geo, RadarCalibration, METERS_PER_DEGREE_LAT};
pub use zones::{classify, point_in_polygon, Zone, ZoneCategory, ZoneIndex};

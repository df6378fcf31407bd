//! Detection, geofence and camera-aiming core for the radar gateway.
//!
//! Raw radar frames flow one way through the crate: the upstream text is
//! repaired and parsed, each detection is placed on the map, tagged with the
//! highest-priority geofence zone containing it, fanned out to observers, and
//! (unless an operator holds manual control) turned into a normalized PTZ
//! command for the camera.

pub mod broadcast;
pub mod config;
pub mod control;
pub mod geo;
pub mod ingest;
pub mod math;
pub mod prelude;
pub mod ptz;
pub mod telemetry;

pub use prelude::{CoreError, CoreResult, DetectionFrame, GeoPoint, PtzCommand, RadarPoint};

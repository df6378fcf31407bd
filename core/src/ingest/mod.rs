//! Upstream radar ingestion: connection handling, frame repair, and the
//! per-frame pipeline that feeds observers and the camera.

pub mod context;
pub mod ingestion;
pub mod processor;
pub mod repair;
pub mod source;

pub use context::{ConfigSnapshot, CycleContext};
pub use ingestion::{CycleReport, IngestConfig, IngestionLoop, LinkState, Pipeline};
pub use processor::{build_frame, PointSelection};
pub use repair::{parse_frame, repair_frame};
pub use source::{RadarSession, RadarSource, WsRadarSource};

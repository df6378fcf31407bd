use serde::{Deserialize, Serialize};

use crate::ingest::context::ConfigSnapshot;
use crate::prelude::{DetectionFrame, RadarPoint, TrackedPoint};

/// Which detections of a frame are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointSelection {
    #[default]
    All,
    /// Only the first detection, for single-target feeds.
    First,
}

/// Locates and classifies detections against one configuration snapshot.
pub fn build_frame(
    detections: &[RadarPoint],
    snapshot: &ConfigSnapshot,
    selection: PointSelection,
) -> DetectionFrame {
    let take = match selection {
        PointSelection::All => detections.len(),
        PointSelection::First => 1,
    };
    let points = detections
        .iter()
        .take(take)
        .map(|detection| {
            let point = snapshot.radar.locate(detection);
            let zone = snapshot.zones.classify(point.latitude, point.longitude);
            TrackedPoint {
                zone: zone.map(|z| z.alert()),
                priority: zone.map(|z| z.priority()).unwrap_or(0),
                point,
            }
        })
        .collect();
    DetectionFrame::new(points)
}

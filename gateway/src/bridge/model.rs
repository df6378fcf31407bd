use radarcore::geo::{coverage_polygon, Zone};
use radarcore::ingest::{ConfigSnapshot, LinkState};
use radarcore::telemetry::MetricsSnapshot;
use serde::Serialize;

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusModel {
    pub link: LinkState,
    pub manual_active: bool,
    pub remaining_secs: Option<f64>,
    pub observers: usize,
    pub metrics: MetricsSnapshot,
}

/// Body of `POST /manual`.
#[derive(Debug, Clone, Serialize)]
pub struct ManualAck {
    pub manual_active: bool,
    pub expires_in_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarPosition {
    pub latitud: f64,
    pub longitud: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageModel {
    pub vertices: Vec<[f64; 2]>,
}

/// Body of `GET /zones`: radar position, coverage and active geofences.
#[derive(Debug, Clone, Serialize)]
pub struct SiteOverview {
    pub radar: RadarPosition,
    pub poligono: CoverageModel,
    pub zonas: Vec<Zone>,
}

impl From<&ConfigSnapshot> for SiteOverview {
    fn from(snapshot: &ConfigSnapshot) -> Self {
        Self {
            radar: RadarPosition {
                latitud: snapshot.radar.latitude,
                longitud: snapshot.radar.longitude,
            },
            poligono: CoverageModel {
                vertices: coverage_polygon(&snapshot.radar),
            },
            zonas: snapshot.zones.zones().to_vec(),
        }
    }
}

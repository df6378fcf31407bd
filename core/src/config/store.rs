use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::geo::{RadarCalibration, Zone};
use crate::prelude::{CoreError, CoreResult};
use crate::ptz::CameraCalibration;

/// Everything the pipeline needs to know about one deployment site.
///
/// A camera without a surveyed position is assumed to share the radar mast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SiteDocument")]
pub struct SiteConfig {
    pub radar: RadarCalibration,
    pub camera: CameraCalibration,
    pub zones: Vec<Zone>,
}

#[derive(Deserialize)]
struct SiteDocument {
    radar: RadarCalibration,
    #[serde(default)]
    camera: CameraDocument,
    #[serde(default)]
    zones: Vec<Zone>,
}

#[derive(Default, Deserialize)]
struct CameraDocument {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(flatten)]
    calibration: CameraCalibration,
}

impl TryFrom<SiteDocument> for SiteConfig {
    type Error = String;

    fn try_from(doc: SiteDocument) -> Result<Self, Self::Error> {
        let mut camera = doc.camera.calibration;
        match (doc.camera.latitude, doc.camera.longitude) {
            (Some(latitude), Some(longitude)) => {
                camera.latitude = latitude;
                camera.longitude = longitude;
            }
            (None, None) => {
                camera.latitude = doc.radar.latitude;
                camera.longitude = doc.radar.longitude;
            }
            _ => return Err("camera latitude and longitude must be given together".into()),
        }
        Ok(Self {
            radar: doc.radar,
            camera,
            zones: doc.zones,
        })
    }
}

impl SiteConfig {
    pub fn from_yaml(contents: &str) -> CoreResult<Self> {
        serde_yaml::from_str(contents).map_err(|err| CoreError::Config(err.to_string()))
    }
}

/// Read side of the configuration store.
///
/// Writes happen elsewhere (the admin console); the pipeline only reads and
/// picks up changes on its next refresh.
pub trait ConfigStore: Send + Sync {
    fn list_zones(&self) -> CoreResult<Vec<Zone>>;
    fn get_calibration(&self) -> CoreResult<CameraCalibration>;
    fn get_radar(&self) -> CoreResult<RadarCalibration>;
}

/// Store backed by a YAML file that is re-read on every call.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> CoreResult<SiteConfig> {
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            CoreError::Config(format!("reading site config {}: {}", self.path.display(), err))
        })?;
        serde_yaml::from_str(&contents).map_err(|err| {
            CoreError::Config(format!("parsing site config {}: {}", self.path.display(), err))
        })
    }
}

impl ConfigStore for YamlConfigStore {
    fn list_zones(&self) -> CoreResult<Vec<Zone>> {
        Ok(self.load()?.zones)
    }

    fn get_calibration(&self) -> CoreResult<CameraCalibration> {
        Ok(self.load()?.camera)
    }

    fn get_radar(&self) -> CoreResult<RadarCalibration> {
        Ok(self.load()?.radar)
    }
}

/// In-process store. Updates swap the whole site document at once.
pub struct MemoryConfigStore {
    site: RwLock<Arc<SiteConfig>>,
}

impl MemoryConfigStore {
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site: RwLock::new(Arc::new(site)),
        }
    }

    pub fn current(&self) -> Arc<SiteConfig> {
        Arc::clone(&self.site.read())
    }

    /// Replaces the camera calibration after validating it.
    pub fn recalibrate(&self, camera: CameraCalibration) -> CoreResult<()> {
        camera.validate()?;
        let mut site = self.site.write();
        let mut next = SiteConfig::clone(&site);
        next.camera = camera;
        *site = Arc::new(next);
        info!("camera calibration replaced");
        Ok(())
    }

    pub fn replace_zones(&self, zones: Vec<Zone>) {
        let mut site = self.site.write();
        let mut next = SiteConfig::clone(&site);
        let count = zones.len();
        next.zones = zones;
        *site = Arc::new(next);
        info!("zone list replaced ({} zones)", count);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn list_zones(&self) -> CoreResult<Vec<Zone>> {
        Ok(self.current().zones.clone())
    }

    fn get_calibration(&self) -> CoreResult<CameraCalibration> {
        Ok(self.current().camera.clone())
    }

    fn get_radar(&self) -> CoreResult<RadarCalibration> {
        Ok(self.current().radar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SITE: &str = r##"
radar:
  latitude: 10.0
  longitude: -70.0
  radius_m: 652
  rotation_deg: 0
camera:
  latitude: 10.0005
  longitude: -70.0005
  altitude_m: 60
  heading_deg: 200
zones:
  - id: 1
    name: patio
    category: interior
    color: "#ff0000"
    coordinates: [[10.0, -70.0], [10.0, -69.99], [10.01, -69.99], [10.01, -70.0]]
"##;

    #[test]
    fn yaml_store_reads_site_document() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SITE.as_bytes()).unwrap();
        let store = YamlConfigStore::new(temp.path());

        let zones = store.list_zones().unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].polygon.len(), 4);
        assert_eq!(store.get_radar().unwrap().meters_per_degree_lat, 111_320.0);
        assert_eq!(store.get_calibration().unwrap().heading_deg, 200.0);
    }

    #[test]
    fn camera_without_position_sits_on_radar() {
        let no_camera = SiteConfig::from_yaml("radar:\n  latitude: 10.0\n  longitude: -70.0\n").unwrap();
        assert_eq!(no_camera.camera.latitude, 10.0);
        assert_eq!(no_camera.camera.longitude, -70.0);

        let mount_only = SiteConfig::from_yaml(
            "radar:\n  latitude: 10.0\n  longitude: -70.0\ncamera:\n  altitude_m: 45\n  heading_deg: 90\n",
        )
        .unwrap();
        assert_eq!(mount_only.camera.latitude, 10.0);
        assert_eq!(mount_only.camera.longitude, -70.0);
        assert_eq!(mount_only.camera.altitude_m, 45.0);
        assert_eq!(mount_only.camera.heading_deg, 90.0);
    }

    #[test]
    fn surveyed_camera_position_is_kept() {
        let site = SiteConfig::from_yaml(SITE).unwrap();
        assert_eq!(site.camera.latitude, 10.0005);
        assert_eq!(site.camera.longitude, -70.0005);
    }

    #[test]
    fn half_a_camera_position_is_rejected() {
        let err = SiteConfig::from_yaml(
            "radar:\n  latitude: 10.0\n  longitude: -70.0\ncamera:\n  latitude: 10.1\n",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Config(ref msg) if msg.contains("together")));
    }

    #[test]
    fn yaml_store_sees_external_edits() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SITE.as_bytes()).unwrap();
        let store = YamlConfigStore::new(temp.path());
        assert_eq!(store.list_zones().unwrap().len(), 1);

        let edited = SITE.replace("zones:", "zones: []\nold_zones:");
        fs::write(temp.path(), edited).unwrap();
        assert!(store.list_zones().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let store = YamlConfigStore::new("/nonexistent/site.yaml");
        assert!(matches!(store.list_zones(), Err(CoreError::Config(_))));
    }

    #[test]
    fn memory_store_swaps_whole_calibration() {
        let store = MemoryConfigStore::new(SiteConfig::from_yaml(SITE).unwrap());
        let before = store.current();

        let mut camera = store.get_calibration().unwrap();
        camera.heading_deg = 90.0;
        store.recalibrate(camera).unwrap();

        assert_eq!(before.camera.heading_deg, 200.0);
        assert_eq!(store.get_calibration().unwrap().heading_deg, 90.0);
    }

    #[test]
    fn memory_store_rejects_invalid_calibration() {
        let store = MemoryConfigStore::new(SiteConfig::from_yaml(SITE).unwrap());
        let mut camera = store.get_calibration().unwrap();
        camera.pan_limit_deg = 0.0;
        assert!(store.recalibrate(camera).is_err());
        assert_eq!(store.get_calibration().unwrap().pan_limit_deg, 180.0);
    }

    #[test]
    fn memory_store_replaces_zone_list() {
        let store = MemoryConfigStore::new(SiteConfig::from_yaml(SITE).unwrap());
        store.replace_zones(Vec::new());
        assert!(store.list_zones().unwrap().is_empty());
    }
}

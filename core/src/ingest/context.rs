use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::ConfigStore;
use crate::geo::{RadarCalibration, ZoneIndex};
use crate::prelude::CoreResult;
use crate::ptz::CameraCalibration;

/// Validated configuration used, unchanged, for a stretch of frames.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub radar: RadarCalibration,
    pub camera: CameraCalibration,
    pub zones: ZoneIndex,
}

impl ConfigSnapshot {
    pub fn load(store: &dyn ConfigStore) -> CoreResult<Self> {
        let radar = store.get_radar()?;
        radar.validate()?;
        let camera = store.get_calibration()?;
        camera.validate()?;
        let zones = ZoneIndex::new(store.list_zones()?);
        Ok(Self {
            radar,
            camera,
            zones,
        })
    }
}

/// State owned by the ingestion loop across cycles.
///
/// Holds the current snapshot and decides when to go back to the store.
/// A failed refresh keeps the previous snapshot.
pub struct CycleContext {
    store: Arc<dyn ConfigStore>,
    refresh_every: Duration,
    snapshot: Arc<ConfigSnapshot>,
    loaded_at: Instant,
    published: watch::Sender<Arc<ConfigSnapshot>>,
}

impl CycleContext {
    /// Loads the first snapshot. Failing here is fatal for the caller.
    pub fn bootstrap(store: Arc<dyn ConfigStore>, refresh_every: Duration) -> CoreResult<Self> {
        let snapshot = ConfigSnapshot::load(store.as_ref())?;
        info!(
            "configuration loaded: radar at ({:.6}, {:.6}), {} zones",
            snapshot.radar.latitude,
            snapshot.radar.longitude,
            snapshot.zones.len()
        );
        let snapshot = Arc::new(snapshot);
        let (published, _) = watch::channel(Arc::clone(&snapshot));
        Ok(Self {
            store,
            refresh_every,
            snapshot,
            loaded_at: Instant::now(),
            published,
        })
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Follows the snapshot in use, for read-only consumers outside the loop.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.published.subscribe()
    }

    pub fn refresh_if_due(&mut self) -> bool {
        if self.loaded_at.elapsed() < self.refresh_every {
            return false;
        }
        self.refresh()
    }

    /// Re-reads the store now. Returns whether the snapshot was replaced.
    pub fn refresh(&mut self) -> bool {
        self.loaded_at = Instant::now();
        match ConfigSnapshot::load(self.store.as_ref()) {
            Ok(snapshot) => {
                debug!("configuration refreshed ({} zones)", snapshot.zones.len());
                self.snapshot = Arc::new(snapshot);
                self.published.send_replace(Arc::clone(&self.snapshot));
                true
            }
            Err(err) => {
                warn!("configuration refresh failed, keeping last known good: {}", err);
                false
            }
        }
    }
}

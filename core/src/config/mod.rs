//! Site configuration: radar placement, camera calibration and geofences.

pub mod store;

pub use store::{ConfigStore, MemoryConfigStore, SiteConfig, YamlConfigStore};

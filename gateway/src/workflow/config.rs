use anyhow::Context;
use radarcore::broadcast::DEFAULT_OBSERVER_QUEUE;
use radarcore::ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub radar_url: String,
    pub bind_addr: SocketAddr,
    pub site_path: PathBuf,
    pub override_timeout_secs: u64,
    pub ingestion: IngestConfig,
    pub hub: HubConfig,
    pub actuator: ActuatorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            radar_url: "ws://127.0.0.1:8765/".into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            site_path: PathBuf::from("site.yaml"),
            override_timeout_secs: 15,
            ingestion: IngestConfig::default(),
            hub: HubConfig::default(),
            actuator: ActuatorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub observer_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            observer_queue: DEFAULT_OBSERVER_QUEUE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    #[default]
    Log,
    Http,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub kind: ActuatorKind,
    /// Camera driver endpoint, required for `http`.
    pub url: Option<String>,
    pub include_zoom: bool,
    pub dispatch_timeout_ms: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Log,
            url: None,
            include_zoom: false,
            dispatch_timeout_ms: 2_000,
        }
    }
}

impl ActuatorConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading gateway config {}", path_ref.display()))?;
        let config: GatewayConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing gateway config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Command-line values win over the file.
    pub fn with_overrides(
        mut self,
        radar_url: Option<String>,
        bind_addr: Option<SocketAddr>,
        site_path: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = radar_url {
            self.radar_url = url;
        }
        if let Some(addr) = bind_addr {
            self.bind_addr = addr;
        }
        if let Some(path) = site_path {
            self.site_path = path;
        }
        self
    }

    pub fn override_timeout(&self) -> Duration {
        Duration::from_secs(self.override_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::ingest::PointSelection;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_fill_missing_sections() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"radar_url: ws://10.0.0.5:9000/\n").unwrap();
        let path = temp.into_temp_path();
        let cfg = GatewayConfig::load(&path).unwrap();
        assert_eq!(cfg.radar_url, "ws://10.0.0.5:9000/");
        assert_eq!(cfg.override_timeout_secs, 15);
        assert_eq!(cfg.ingestion.reconnect_backoff_ms, 1_000);
        assert_eq!(cfg.actuator.kind, ActuatorKind::Log);
    }

    #[test]
    fn config_load_reads_nested_sections() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind_addr: 127.0.0.1:9100\n\
              ingestion:\n  point_selection: first\n  idle_timeout_ms: 0\n\
              hub:\n  observer_queue: 4\n\
              actuator:\n  kind: http\n  url: http://cam.local/ptz\n  include_zoom: true\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = GatewayConfig::load(&path).unwrap();
        assert_eq!(cfg.bind_addr.port(), 9100);
        assert_eq!(cfg.ingestion.point_selection, PointSelection::First);
        assert_eq!(cfg.ingestion.idle_timeout(), None);
        assert_eq!(cfg.hub.observer_queue, 4);
        assert_eq!(cfg.actuator.kind, ActuatorKind::Http);
        assert!(cfg.actuator.include_zoom);
    }

    #[test]
    fn overrides_replace_file_values() {
        let cfg = GatewayConfig::default().with_overrides(
            Some("ws://radar:1/".into()),
            None,
            Some(PathBuf::from("/etc/site.yaml")),
        );
        assert_eq!(cfg.radar_url, "ws://radar:1/");
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert_eq!(cfg.site_path, PathBuf::from("/etc/site.yaml"));
    }

    #[test]
    fn shipped_configs_parse() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
        let cfg = GatewayConfig::load(root.join("config/gateway.yaml")).unwrap();
        assert_eq!(cfg.site_path, PathBuf::from("config/site.yaml"));

        let site = radarcore::config::YamlConfigStore::new(root.join(&cfg.site_path))
            .load()
            .unwrap();
        assert_eq!(site.zones.len(), 2);
        assert!(site.camera.validate().is_ok());
    }

    #[test]
    fn unreadable_config_reports_path() {
        let err = GatewayConfig::load("/nonexistent/gateway.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/gateway.yaml"));
    }
}

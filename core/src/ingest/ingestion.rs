use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::broadcast::BroadcastHub;
use crate::control::OverrideGate;
use crate::ingest::context::{ConfigSnapshot, CycleContext};
use crate::ingest::processor::{build_frame, PointSelection};
use crate::ingest::repair::parse_frame;
use crate::ingest::source::{RadarSession, RadarSource};
use crate::prelude::{CoreResult, PtzCommand};
use crate::ptz::{solve, CommandDispatcher, PtzTarget};
use crate::telemetry::MetricsRecorder;

/// Upstream connection tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub reconnect_backoff_ms: u64,
    pub connect_timeout_ms: u64,
    /// Reconnect when the radar is silent this long. Zero disables.
    pub idle_timeout_ms: u64,
    pub config_refresh_secs: u64,
    pub point_selection: PointSelection,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: 1_000,
            connect_timeout_ms: 5_000,
            idle_timeout_ms: 30_000,
            config_refresh_secs: 30,
            point_selection: PointSelection::All,
        }
    }
}

impl IngestConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }

    pub fn config_refresh(&self) -> Duration {
        Duration::from_secs(self.config_refresh_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Streaming,
}

/// What one frame turned into.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleReport {
    pub points: usize,
    pub alerts: usize,
    pub delivered: usize,
    pub command: Option<PtzCommand>,
    pub suppressed: bool,
}

/// Per-frame processing shared by the live loop and offline replay.
pub struct Pipeline {
    pub hub: Arc<BroadcastHub>,
    pub gate: OverrideGate,
    pub dispatcher: CommandDispatcher,
    pub metrics: Arc<MetricsRecorder>,
    pub selection: PointSelection,
    pub include_zoom: bool,
}

impl Pipeline {
    /// Parses, locates, classifies and broadcasts one raw frame, then aims
    /// the camera at the top-priority target unless manual control is held.
    pub fn process(&self, raw: &str, snapshot: &ConfigSnapshot) -> CoreResult<CycleReport> {
        let detections = parse_frame(raw).map_err(|err| {
            self.metrics.record_malformed();
            err
        })?;

        let frame = build_frame(&detections, snapshot, self.selection);
        let outcome = self.hub.broadcast(&frame);
        if outcome.dropped > 0 {
            self.metrics.record_observers_dropped(outcome.dropped);
        }
        self.metrics.record_processed();

        let mut report = CycleReport {
            points: frame.points.len(),
            alerts: frame.alert_count(),
            delivered: outcome.delivered,
            ..Default::default()
        };

        let Some(target) = frame.priority_target() else {
            return Ok(report);
        };
        if self.gate.is_manual_active() {
            debug!("manual control held, not aiming at {:?}", target.point.id);
            self.metrics.record_suppressed();
            report.suppressed = true;
            return Ok(report);
        }

        let solution = solve(&PtzTarget::from(&target.point), &snapshot.camera);
        let command = solution.to_command(self.include_zoom);
        self.dispatcher.dispatch(command);
        report.command = Some(command);
        Ok(report)
    }
}

enum SessionEnd {
    Lost,
    Shutdown,
}

enum Received {
    Frame(CoreResult<Option<String>>),
    Idle(Duration),
}

/// Long-lived task owning the upstream connection.
///
/// Upstream closes of any kind lead back to a reconnect; only the local
/// shutdown signal ends the loop.
pub struct IngestionLoop<S: RadarSource> {
    source: S,
    context: CycleContext,
    pipeline: Pipeline,
    config: IngestConfig,
    link: watch::Sender<LinkState>,
}

impl<S: RadarSource> IngestionLoop<S> {
    pub fn new(source: S, context: CycleContext, pipeline: Pipeline, config: IngestConfig) -> Self {
        let (link, _) = watch::channel(LinkState::Disconnected);
        Self {
            source,
            context,
            pipeline,
            config,
            link,
        }
    }

    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.link.subscribe()
    }

    pub fn config_snapshots(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.context.subscribe()
    }

    fn set_link(&self, state: LinkState) {
        self.link.send_replace(state);
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let upstream = self.source.describe();
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_link(LinkState::Connecting);
            info!("connecting to radar at {}", upstream);
            let connect_timeout = self.config.connect_timeout();
            let attempt = tokio::select! {
                _ = stopped(&mut shutdown) => break,
                attempt = tokio::time::timeout(connect_timeout, self.source.connect()) => attempt,
            };

            match attempt {
                Ok(Ok(session)) => {
                    self.set_link(LinkState::Streaming);
                    self.context.refresh();
                    if let SessionEnd::Shutdown = self.stream(session, &mut shutdown).await {
                        break;
                    }
                }
                Ok(Err(err)) => warn!("radar connection failed: {}", err),
                Err(_) => warn!("radar did not answer within {:?}", connect_timeout),
            }

            self.set_link(LinkState::Disconnected);
            self.pipeline.metrics.record_reconnect();
            let backoff = self.config.backoff();
            info!("retrying radar connection in {:?}", backoff);
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }

        self.set_link(LinkState::Disconnected);
        self.pipeline.gate.shutdown();
        info!("ingestion stopped");
    }

    async fn stream(
        &mut self,
        mut session: S::Session,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let idle = self.config.idle_timeout();
        loop {
            let received = tokio::select! {
                _ = stopped(shutdown) => None,
                received = next_or_idle(&mut session, idle) => Some(received),
            };

            match received {
                None => {
                    session.close().await;
                    return SessionEnd::Shutdown;
                }
                Some(Received::Idle(limit)) => {
                    warn!("no radar frame for {:?}, dropping connection", limit);
                    session.close().await;
                    return SessionEnd::Lost;
                }
                Some(Received::Frame(Err(err))) => {
                    warn!("radar link lost: {}", err);
                    return SessionEnd::Lost;
                }
                Some(Received::Frame(Ok(None))) => {
                    info!("radar closed the connection");
                    return SessionEnd::Lost;
                }
                Some(Received::Frame(Ok(Some(raw)))) => {
                    self.context.refresh_if_due();
                    let snapshot = self.context.snapshot();
                    if let Err(err) = self.pipeline.process(&raw, &snapshot) {
                        warn!("dropping frame: {}", err);
                    }
                }
            }
        }
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn next_or_idle<T: RadarSession>(session: &mut T, idle: Option<Duration>) -> Received {
    match idle {
        Some(limit) => match tokio::time::timeout(limit, session.next_frame()).await {
            Ok(frame) => Received::Frame(frame),
            Err(_) => Received::Idle(limit),
        },
        None => Received::Frame(session.next_frame().await),
    }
}

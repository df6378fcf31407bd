use crate::bridge::routes::{routes, BridgeState};
use crate::generator::profile::{FeedConfig, SyntheticFeed};
use crate::workflow::actuator::build_actuator;
use crate::workflow::config::GatewayConfig;
use anyhow::Context;
use log::{info, warn};
use radarcore::broadcast::BroadcastHub;
use radarcore::config::{ConfigStore, YamlConfigStore};
use radarcore::control::OverrideGate;
use radarcore::ingest::{CycleContext, IngestionLoop, Pipeline, WsRadarSource};
use radarcore::ptz::{CommandDispatcher, LoggingActuator};
use radarcore::telemetry::MetricsRecorder;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Totals from an offline replay.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OfflineSummary {
    pub frames: usize,
    pub points: usize,
    pub alerts: usize,
    pub commands: usize,
    pub rejected: usize,
}

#[derive(Clone)]
pub struct Runner {
    config: GatewayConfig,
}

impl Runner {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    fn store(&self) -> Arc<dyn ConfigStore> {
        Arc::new(YamlConfigStore::new(&self.config.site_path))
    }

    fn bootstrap(&self) -> anyhow::Result<CycleContext> {
        CycleContext::bootstrap(self.store(), self.config.ingestion.config_refresh())
            .with_context(|| {
                format!(
                    "loading initial site configuration from {}",
                    self.config.site_path.display()
                )
            })
    }

    /// Runs ingestion and the HTTP bridge until `shutdown` resolves.
    pub async fn serve(&self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let context = self.bootstrap()?;
        let metrics = Arc::new(MetricsRecorder::new());
        let hub = Arc::new(BroadcastHub::with_capacity(self.config.hub.observer_queue));
        let gate = OverrideGate::new(self.config.override_timeout());
        let actuator = build_actuator(&self.config.actuator)?;
        let (dispatcher, actuator_task) = CommandDispatcher::spawn(
            actuator,
            self.config.actuator.dispatch_timeout(),
            metrics.clone(),
        );

        let pipeline = Pipeline {
            hub: hub.clone(),
            gate: gate.clone(),
            dispatcher,
            metrics: metrics.clone(),
            selection: self.config.ingestion.point_selection,
            include_zoom: self.config.actuator.include_zoom,
        };
        let ingest = IngestionLoop::new(
            WsRadarSource::new(self.config.radar_url.clone()),
            context,
            pipeline,
            self.config.ingestion.clone(),
        );

        let state = BridgeState {
            hub,
            gate,
            metrics,
            link: ingest.link_state(),
            site: ingest.config_snapshots(),
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut server_stop = stop_rx.clone();
        let (addr, server) = warp::serve(routes(state))
            .try_bind_with_graceful_shutdown(self.config.bind_addr, async move {
                let _ = server_stop.wait_for(|stop| *stop).await;
            })
            .with_context(|| format!("binding HTTP bridge on {}", self.config.bind_addr))?;
        info!("observer bridge listening on http://{}", addr);

        let server_task = tokio::spawn(server);
        let ingest_task = tokio::spawn(ingest.run(stop_rx));

        shutdown.await;
        info!("shutting down");
        let _ = stop_tx.send(true);

        ingest_task.await.context("joining ingestion task")?;
        server_task.await.context("joining HTTP bridge")?;
        if let Err(err) = actuator_task.await {
            warn!("actuator task ended abnormally: {}", err);
        }
        Ok(())
    }

    /// Pushes synthetic frames through the pipeline without any sockets.
    pub async fn offline(&self, frames: usize, feed: FeedConfig) -> anyhow::Result<OfflineSummary> {
        let context = self.bootstrap()?;
        let snapshot = context.snapshot();
        let metrics = Arc::new(MetricsRecorder::new());
        let (dispatcher, actuator_task) = CommandDispatcher::spawn(
            Arc::new(LoggingActuator::new("offline-ptz")),
            self.config.actuator.dispatch_timeout(),
            metrics.clone(),
        );
        let pipeline = Pipeline {
            hub: Arc::new(BroadcastHub::new()),
            gate: OverrideGate::new(self.config.override_timeout()),
            dispatcher,
            metrics,
            selection: self.config.ingestion.point_selection,
            include_zoom: self.config.actuator.include_zoom,
        };

        let mut feed = SyntheticFeed::new(feed);
        let mut summary = OfflineSummary::default();
        for _ in 0..frames {
            let raw = feed.next_frame();
            summary.frames += 1;
            match pipeline.process(&raw, &snapshot) {
                Ok(report) => {
                    summary.points += report.points;
                    summary.alerts += report.alerts;
                    summary.commands += usize::from(report.command.is_some());
                }
                Err(err) => {
                    warn!("offline frame rejected: {}", err);
                    summary.rejected += 1;
                }
            }
        }

        drop(pipeline);
        actuator_task.await.context("joining actuator task")?;
        Ok(summary)
    }
}

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::prelude::PtzCommand;
use crate::ptz::actuator::PtzActuator;
use crate::telemetry::MetricsRecorder;

/// Hands commands to a dedicated actuator task.
///
/// Only the latest command is kept: if the actuator is still busy with an
/// earlier move, intermediate commands are overwritten rather than queued, and
/// the ingestion side never waits on the camera.
pub struct CommandDispatcher {
    tx: watch::Sender<Option<PtzCommand>>,
}

impl CommandDispatcher {
    /// Spawns the actuator task. It exits once the dispatcher is dropped.
    pub fn spawn(
        actuator: Arc<dyn PtzActuator>,
        timeout: Duration,
        metrics: Arc<MetricsRecorder>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = watch::channel(None::<PtzCommand>);
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let command = *rx.borrow_and_update();
                let Some(command) = command else { continue };
                match tokio::time::timeout(timeout, actuator.absolute_move(&command)).await {
                    Ok(Ok(())) => {
                        debug!("{} accepted {:?}", actuator.name(), command);
                        metrics.record_dispatched();
                    }
                    Ok(Err(err)) => {
                        warn!("{} rejected command: {}", actuator.name(), err);
                        metrics.record_actuator_failure();
                    }
                    Err(_) => {
                        warn!(
                            "{} did not answer within {:?}, dropping command",
                            actuator.name(),
                            timeout
                        );
                        metrics.record_actuator_failure();
                    }
                }
            }
            debug!("actuator task for {} stopped", actuator.name());
        });
        (Self { tx }, handle)
    }

    pub fn dispatch(&self, command: PtzCommand) {
        self.tx.send_replace(Some(command));
    }
}

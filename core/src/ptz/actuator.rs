use futures_util::future::BoxFuture;
use log::info;

use crate::prelude::{CoreResult, PtzCommand};

/// Sink for normalized camera commands.
///
/// The core never speaks a camera's wire protocol; drivers (physical or
/// simulated) implement this and receive absolute positions only.
pub trait PtzActuator: Send + Sync {
    fn name(&self) -> &str;

    fn absolute_move<'a>(&'a self, command: &'a PtzCommand) -> BoxFuture<'a, CoreResult<()>>;
}

/// Simulated camera that only logs what it would do.
pub struct LoggingActuator {
    name: String,
}

impl LoggingActuator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl PtzActuator for LoggingActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn absolute_move<'a>(&'a self, command: &'a PtzCommand) -> BoxFuture<'a, CoreResult<()>> {
        Box::pin(async move {
            info!(
                "[{}] absolute move pan={:.4} tilt={:.4} zoom={:?}",
                self.name, command.pan, command.tilt, command.zoom
            );
            Ok(())
        })
    }
}

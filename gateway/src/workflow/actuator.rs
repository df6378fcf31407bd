use crate::workflow::config::{ActuatorConfig, ActuatorKind};
use anyhow::Context;
use futures_util::future::BoxFuture;
use log::debug;
use radarcore::ptz::{LoggingActuator, PtzActuator};
use radarcore::{CoreError, CoreResult, PtzCommand};
use std::sync::Arc;

/// Forwards normalized commands to a camera driver over HTTP.
pub struct HttpActuator {
    client: reqwest::Client,
    url: String,
}

impl HttpActuator {
    pub fn new(url: impl Into<String>, config: &ActuatorConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.dispatch_timeout())
            .build()
            .context("building camera HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PtzActuator for HttpActuator {
    fn name(&self) -> &str {
        &self.url
    }

    fn absolute_move<'a>(&'a self, command: &'a PtzCommand) -> BoxFuture<'a, CoreResult<()>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(command)
                .send()
                .await
                .map_err(|err| CoreError::Actuator(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(CoreError::Actuator(format!(
                    "{} answered {}",
                    self.url, status
                )));
            }
            debug!("{} moved to {:?}", self.url, command);
            Ok(())
        })
    }
}

pub fn build_actuator(config: &ActuatorConfig) -> anyhow::Result<Arc<dyn PtzActuator>> {
    match config.kind {
        ActuatorKind::Log => Ok(Arc::new(LoggingActuator::new("simulated-ptz"))),
        ActuatorKind::Http => {
            let url = config
                .url
                .clone()
                .context("actuator kind `http` needs `actuator.url`")?;
            Ok(Arc::new(HttpActuator::new(url, config)?))
        }
    }
}

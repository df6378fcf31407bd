use std::future::Future;

use futures_util::StreamExt;
use log::{debug, info};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::prelude::{CoreError, CoreResult};

/// One open upstream connection.
pub trait RadarSession: Send {
    /// Next raw text frame; `Ok(None)` once the upstream has closed.
    fn next_frame(&mut self) -> impl Future<Output = CoreResult<Option<String>>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Something the ingestion loop can (re)connect to.
pub trait RadarSource: Send {
    type Session: RadarSession;

    fn describe(&self) -> String;

    fn connect(&mut self) -> impl Future<Output = CoreResult<Self::Session>> + Send;
}

/// Radar head reachable over a websocket.
pub struct WsRadarSource {
    url: String,
}

impl WsRadarSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RadarSource for WsRadarSource {
    type Session = WsRadarSession;

    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn connect(&mut self) -> CoreResult<WsRadarSession> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|err| CoreError::Upstream(format!("{}: {}", self.url, err)))?;
        info!("connected to radar at {} ({})", self.url, response.status());
        Ok(WsRadarSession { stream })
    }
}

pub struct WsRadarSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RadarSession for WsRadarSession {
    async fn next_frame(&mut self) -> CoreResult<Option<String>> {
        while let Some(message) = self.stream.next().await {
            match message.map_err(|err| CoreError::Upstream(err.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Message::Close(frame) => {
                    debug!("radar sent close: {:?}", frame);
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!("closing radar socket: {}", err);
        }
    }
}

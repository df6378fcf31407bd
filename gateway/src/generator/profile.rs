use chrono::Local;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::time::Duration;
use warp::ws::{Message, WebSocket};
use warp::Filter;

/// Configuration for the synthetic radar feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub tracks: usize,
    /// Tracks wander inside `x` in `[-r, r]`, `y` in `[0, r]`.
    pub range_m: f64,
    pub step_m: f64,
    pub interval_ms: u64,
    pub seed: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tracks: 3,
            range_m: 300.0,
            step_m: 4.0,
            interval_ms: 100,
            seed: 0,
        }
    }
}

/// Random-walk targets rendered in the radar's own quasi-JSON dialect.
pub struct SyntheticFeed {
    config: FeedConfig,
    rng: StdRng,
    tracks: Vec<(f64, f64)>,
}

impl SyntheticFeed {
    pub fn new(config: FeedConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let r = config.range_m.abs().max(1.0);
        let tracks = (0..config.tracks)
            .map(|_| (rng.gen_range(-r..r), rng.gen_range(0.0..r)))
            .collect();
        Self { config, rng, tracks }
    }

    fn advance(&mut self) {
        let r = self.config.range_m.abs().max(1.0);
        let step = self.config.step_m.abs();
        for (x, y) in self.tracks.iter_mut() {
            if step > 0.0 {
                *x = (*x + self.rng.gen_range(-step..step)).clamp(-r, r);
                *y = (*y + self.rng.gen_range(-step..step)).clamp(0.0, r);
            }
        }
    }

    /// Next frame, bare keys and a trailing wall-clock stamp included.
    pub fn next_frame(&mut self) -> String {
        self.advance();
        let mut frame = String::from("{data:[");
        for (index, (x, y)) in self.tracks.iter().enumerate() {
            if index > 0 {
                frame.push(',');
            }
            let azimuth = x.atan2(*y).to_degrees();
            let distance = x.hypot(*y);
            let _ = write!(
                frame,
                "{{x:{:.2},y:{:.2},a:{:.2},d:{:.2},id:{},type:1}}",
                x,
                y,
                azimuth,
                distance,
                index + 1
            );
        }
        frame.push_str("]}");
        frame.push_str(&Local::now().format("%H:%M:%S%.3f").to_string());
        frame
    }
}

/// Serves the synthetic feed to any websocket client until `shutdown` fires.
pub async fn serve_feed(
    addr: SocketAddr,
    config: FeedConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let route = warp::ws().map(move |ws: warp::ws::Ws| {
        let config = config.clone();
        ws.on_upgrade(move |socket| stream_feed(socket, config))
    });
    let (bound, server) = warp::serve(route).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!("synthetic radar feed on ws://{}/", bound);
    tokio::spawn(server);
    Ok(bound)
}

async fn stream_feed(socket: WebSocket, config: FeedConfig) {
    let (mut tx, mut rx) = socket.split();
    let interval = Duration::from_millis(config.interval_ms.max(1));
    let mut feed = SyntheticFeed::new(config);
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tx.send(Message::text(feed.next_frame())).await.is_err() {
                    break;
                }
            }
            incoming = rx.next() => match incoming {
                Some(Ok(message)) if !message.is_close() => {}
                _ => break,
            },
        }
    }
    debug!("synthetic feed client left");
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::ingest::parse_frame;

    #[test]
    fn frames_repair_into_detections() {
        let mut feed = SyntheticFeed::new(FeedConfig {
            tracks: 4,
            ..Default::default()
        });
        let raw = feed.next_frame();
        assert!(raw.starts_with("{data:[{x:"));
        assert!(!raw.ends_with('}'));

        let points = parse_frame(&raw).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[3].id, Some(serde_json::json!(4)));
        for point in &points {
            assert!(point.x_m.abs() <= 300.0);
            assert!((0.0..=300.0).contains(&point.y_m));
            assert!(point.slant_range_m.unwrap() >= 0.0);
        }
    }

    #[test]
    fn same_seed_gives_same_tracks() {
        let mut a = SyntheticFeed::new(FeedConfig::default());
        let mut b = SyntheticFeed::new(FeedConfig::default());
        let pa = parse_frame(&a.next_frame()).unwrap();
        let pb = parse_frame(&b.next_frame()).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn empty_feed_has_empty_data() {
        let mut feed = SyntheticFeed::new(FeedConfig {
            tracks: 0,
            ..Default::default()
        });
        assert!(parse_frame(&feed.next_frame()).unwrap().is_empty());
    }
}

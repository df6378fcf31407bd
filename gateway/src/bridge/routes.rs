use crate::bridge::model::{ManualAck, SiteOverview, StatusModel};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use radarcore::broadcast::BroadcastHub;
use radarcore::control::OverrideGate;
use radarcore::ingest::{ConfigSnapshot, LinkState};
use radarcore::telemetry::MetricsRecorder;
use radarcore::{CoreError, CoreResult};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use warp::ws::{Message, WebSocket};
use warp::Filter;

const OBSERVER_SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// Handles shared by every HTTP route.
#[derive(Clone)]
pub struct BridgeState {
    pub hub: Arc<BroadcastHub>,
    pub gate: OverrideGate,
    pub metrics: Arc<MetricsRecorder>,
    pub link: watch::Receiver<LinkState>,
    pub site: watch::Receiver<Arc<ConfigSnapshot>>,
}

fn with_state(
    state: BridgeState,
) -> impl Filter<Extract = (BridgeState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub fn routes(
    state: BridgeState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let radar_route = warp::path("radar")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_state(state.clone()))
        .map(|ws: warp::ws::Ws, state: BridgeState| {
            let hub = state.hub.clone();
            ws.on_upgrade(move |socket| observe(socket, hub))
        });

    let manual_route = warp::path("manual")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_state(state.clone()))
        .map(|state: BridgeState| {
            state.gate.arm();
            warp::reply::json(&ManualAck {
                manual_active: true,
                expires_in_secs: state.gate.timeout().as_secs_f64(),
            })
        });

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: BridgeState| {
            let link = *state.link.borrow();
            let remaining = state.gate.remaining();
            warp::reply::json(&StatusModel {
                link,
                manual_active: state.gate.is_manual_active(),
                remaining_secs: remaining.map(|r| r.as_secs_f64()),
                observers: state.hub.observer_count(),
                metrics: state.metrics.snapshot(),
            })
        });

    let zones_route = warp::path("zones")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: BridgeState| {
            let snapshot = Arc::clone(&state.site.borrow());
            warp::reply::json(&SiteOverview::from(snapshot.as_ref()))
        });

    radar_route.or(manual_route).or(status_route).or(zones_route)
}

/// Pumps hub payloads into one websocket until either side goes away.
async fn observe(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (id, mut frames) = hub.register();
    let (mut tx, mut rx) = socket.split();
    loop {
        tokio::select! {
            payload = frames.recv() => {
                let Some(payload) = payload else {
                    debug!("{} was dropped by the hub", id);
                    break;
                };
                if let Err(err) = deliver(&mut tx, &payload).await {
                    info!("{}: {}", id, err);
                    break;
                }
            }
            incoming = rx.next() => match incoming {
                Some(Ok(message)) if !message.is_close() => {}
                _ => break,
            },
        }
    }
    hub.unregister(id);
}

async fn deliver<S>(tx: &mut S, payload: &str) -> CoreResult<()>
where
    S: futures_util::Sink<Message, Error = warp::Error> + Unpin,
{
    match tokio::time::timeout(OBSERVER_SEND_TIMEOUT, tx.send(Message::text(payload))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(CoreError::Observer(err.to_string())),
        Err(_) => Err(CoreError::Observer(format!(
            "send stalled for {:?}",
            OBSERVER_SEND_TIMEOUT
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::geo::{RadarCalibration, Zone, ZoneIndex};
    use radarcore::prelude::{DetectionFrame, GeoPoint, TrackedPoint};
    use radarcore::ptz::CameraCalibration;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            radar: RadarCalibration {
                latitude: 10.0,
                longitude: -70.0,
                radius_m: 652.0,
                rotation_deg: 0.0,
                meters_per_degree_lat: 111_320.0,
            },
            camera: CameraCalibration::default(),
            zones: ZoneIndex::new(vec![Zone {
                id: 3,
                name: "gate".into(),
                category: "perimetro".into(),
                color: "#ffaa00".into(),
                polygon: vec![[10.0, -70.0], [10.0, -69.99], [10.01, -69.99]],
            }]),
        }
    }

    fn state() -> BridgeState {
        let (_, link) = watch::channel(LinkState::Streaming);
        let (_, site) = watch::channel(Arc::new(snapshot()));
        BridgeState {
            hub: Arc::new(BroadcastHub::new()),
            gate: OverrideGate::new(Duration::from_secs(15)),
            metrics: Arc::new(MetricsRecorder::new()),
            link,
            site,
        }
    }

    #[tokio::test]
    async fn manual_arms_gate() {
        let state = state();
        let reply = warp::test::request()
            .method("POST")
            .path("/manual")
            .reply(&routes(state.clone()))
            .await;
        assert_eq!(reply.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(body["expires_in_secs"], 15.0);
        assert!(state.gate.is_manual_active());
    }

    #[tokio::test]
    async fn status_reports_link_gate_and_counters() {
        let state = state();
        state.metrics.record_processed();
        let reply = warp::test::request()
            .path("/status")
            .reply(&routes(state))
            .await;
        let body: serde_json::Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(body["link"], "streaming");
        assert_eq!(body["manual_active"], false);
        assert!(body["remaining_secs"].is_null());
        assert_eq!(body["metrics"]["frames_processed"], 1);
    }

    #[tokio::test]
    async fn zones_lists_site_overview() {
        let reply = warp::test::request()
            .path("/zones")
            .reply(&routes(state()))
            .await;
        let body: serde_json::Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(body["radar"]["latitud"], 10.0);
        assert_eq!(body["poligono"]["vertices"].as_array().unwrap().len(), 4);
        assert_eq!(body["zonas"][0]["name"], "gate");
        assert_eq!(body["zonas"][0]["coordinates"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn radar_socket_streams_frames() {
        let state = state();
        let hub = state.hub.clone();
        let mut client = warp::test::ws()
            .path("/radar")
            .handshake(routes(state))
            .await
            .unwrap();

        for _ in 0..100 {
            if hub.observer_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let frame = DetectionFrame::new(vec![TrackedPoint {
            point: GeoPoint {
                id: Some(serde_json::json!(5)),
                kind: Some(serde_json::json!(1)),
                latitude: 10.001,
                longitude: -69.999,
                azimuth_deg: Some(45.0),
                slant_range_m: None,
            },
            zone: None,
            priority: 0,
        }]);
        assert_eq!(hub.broadcast(&frame).delivered, 1);

        let message = client.recv().await.unwrap();
        let body: serde_json::Value = serde_json::from_str(message.to_str().unwrap()).unwrap();
        assert_eq!(body["puntos"][0]["id"], 5);
        assert_eq!(body["puntos"][0]["azimut"], 45.0);
    }

    #[tokio::test]
    async fn unknown_path_is_rejected() {
        let reply = warp::test::request()
            .path("/nope")
            .reply(&routes(state()))
            .await;
        assert_eq!(reply.status(), 404);
    }
}

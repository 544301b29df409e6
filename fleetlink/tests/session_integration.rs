//! Integration tests for the monitoring session.
//!
//! These tests verify the complete data flows through the public API:
//! - Simulated fleet → reconciliation → published nearby view
//! - Live link → batch apply → source switchover and fallback
//! - SOS → live delivery, or local alert + `sosEmergency` broadcast
//!
//! Run with: `cargo test --test session_integration`

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use fleetlink::alerts::{AlertKind, FallbackStore, Severity, SosOutcome, SosRequest};
use fleetlink::fleet::{
    compute_nearby, ConnectionState, DataSource, FleetBroadcaster, FleetProvider, FleetSimulator,
    SimulatorConfig,
};
use fleetlink::geo::GeoPoint;
use fleetlink::live::{Connection, LiveError, Transport, CONNECTION_ADVISORY};
use fleetlink::session::{MonitorConfig, MonitoringSession, SessionConfig};

// ============================================================================
// Test Helpers
// ============================================================================

const FOCAL: &str = "V1234";
const BASE: GeoPoint = GeoPoint::new(12.9716, 77.5946);

fn simulator_config() -> SimulatorConfig {
    SimulatorConfig {
        fleet_size: 5,
        base: BASE,
        seed: Some(11),
        ..Default::default()
    }
}

fn session_config() -> SessionConfig {
    let config = SessionConfig {
        monitor: MonitorConfig {
            focal_id: FOCAL.to_string(),
            simulator: simulator_config(),
            ..Default::default()
        },
        ..Default::default()
    };
    SessionConfig {
        live: config.live.clone().with_vehicle(FOCAL),
        ..config
    }
}

/// Poll `condition` until it holds, failing after 30s of (paused) time.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..3000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Server side of an accepted mock connection.
struct Peer {
    inbound: mpsc::UnboundedSender<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

type Accepted = (mpsc::UnboundedReceiver<String>, Arc<Mutex<Vec<String>>>);

/// Transport that accepts queued connections and refuses once the queue is empty.
#[derive(Clone, Default)]
struct ScriptedTransport {
    accepted: Arc<Mutex<VecDeque<Accepted>>>,
    attempts: Arc<Mutex<u32>>,
}

impl ScriptedTransport {
    fn accept(&self) -> Peer {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.accepted.lock().push_back((rx, sent.clone()));
        Peer { inbound: tx, sent }
    }

    fn attempts(&self) -> u32 {
        *self.attempts.lock()
    }
}

struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl Transport for ScriptedTransport {
    type Conn = ScriptedConnection;

    async fn connect(&self, url: &str) -> Result<ScriptedConnection, LiveError> {
        *self.attempts.lock() += 1;
        let next = self.accepted.lock().pop_front();
        match next {
            Some((inbound, sent)) => Ok(ScriptedConnection { inbound, sent }),
            None => Err(LiveError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

impl Connection for ScriptedConnection {
    async fn send(&mut self, text: String) -> Result<(), LiveError> {
        self.sent.lock().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, LiveError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), LiveError> {
        self.inbound.close();
        Ok(())
    }
}

fn vehicle_update(id: &str, lat: f64, lng: f64) -> String {
    serde_json::json!({
        "type": "vehicle_update",
        "data": {
            "vehicle_id": id,
            "location": { "lat": lat, "lng": lng },
            "speed": 42.5,
            "battery": 80,
        }
    })
    .to_string()
}

// ============================================================================
// Simulated branch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_seeded_fleet_gives_deterministic_nearby_view() {
    let session = MonitoringSession::start_simulated(session_config(), FallbackStore::in_memory());

    // Same seed, same fleet.
    let reference = FleetSimulator::new(simulator_config(), FOCAL, Utc::now());
    let expected = compute_nearby(reference.fleet(), FOCAL, 2.0).unwrap();

    let view = session.nearby().unwrap();
    let ids: Vec<&str> = view.vehicles.iter().map(|v| v.id.as_str()).collect();
    let expected_ids: Vec<&str> = expected.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, expected_ids);

    let focal = view.focal().unwrap();
    assert_eq!(focal.id, FOCAL);
    assert_eq!(focal.position, BASE);
    assert_eq!(focal.distance_from_focal, Some(0.0));
    for other in view.others() {
        assert!(other.distance_from_focal.unwrap() <= 2.0);
    }

    let status = session.status();
    assert_eq!(status.fleet_size, 5);
    assert_eq!(status.nearby_count, expected.len());
    assert_eq!(status.source, DataSource::Simulated);

    session.shutdown().await;
}

// ============================================================================
// SOS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sos_while_disconnected_is_recorded_locally() {
    let transport = ScriptedTransport::default();
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = FallbackStore::open(temp_dir.path());
    let session = MonitoringSession::start_with_live(session_config(), store, transport.clone());
    let mut notifications = session.subscribe_alerts();

    wait_until(|| transport.attempts() >= 1).await;
    assert!(!session.connection_state().is_open());

    let request = SosRequest::new(FOCAL)
        .with_type(AlertKind::Medical)
        .with_severity(Severity::Medium);
    let outcome = session.submit_sos(request).await;

    let SosOutcome::StoredLocally(alert) = outcome else {
        panic!("SOS should not be delivered while disconnected");
    };
    assert_eq!(alert.kind, AlertKind::Medical);
    assert_eq!(alert.severity, Severity::Medium);
    assert!(alert.id.starts_with("sos-"));

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.name(), "sosEmergency");
    assert_eq!(notification.alert().id, alert.id);
    assert_eq!(session.alerts().len(), 1);

    // Persisted for the next session.
    assert_eq!(FallbackStore::open(temp_dir.path()).load_alerts().len(), 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_sos_delivered_when_open() {
    let transport = ScriptedTransport::default();
    let peer = transport.accept();
    let session =
        MonitoringSession::start_with_live(session_config(), FallbackStore::in_memory(), transport);

    assert!(session.wait_until_open(Duration::from_secs(5)).await);
    let outcome = session.submit_sos(SosRequest::new(FOCAL)).await;

    assert!(outcome.is_delivered());
    assert!(session.alerts().is_empty());
    let sent = peer.sent.lock().clone();
    assert!(sent.iter().any(|frame| frame.contains("\"sos_report\"")));

    session.shutdown().await;
}

// ============================================================================
// Live branch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_focal_live_update_switches_source() {
    let transport = ScriptedTransport::default();
    let peer = transport.accept();
    let session =
        MonitoringSession::start_with_live(session_config(), FallbackStore::in_memory(), transport);

    assert!(session.wait_until_open(Duration::from_secs(5)).await);
    wait_until(|| peer.sent.lock().len() >= 2).await;
    assert!(peer.sent.lock()[0].contains(FOCAL));

    peer.inbound.send(vehicle_update(FOCAL, 12.98, 77.60)).unwrap();
    wait_until(|| session.status().source == DataSource::Live).await;

    let view = session.nearby().unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view.focal().unwrap().position, GeoPoint::new(12.98, 77.60));

    peer.inbound.send(vehicle_update("V0002", 12.981, 77.601)).unwrap();
    wait_until(|| session.status().nearby_count == 2).await;

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_live_loss_falls_back_to_simulation() {
    let transport = ScriptedTransport::default();
    let peer = transport.accept();
    let session = MonitoringSession::start_with_live(
        session_config(),
        FallbackStore::in_memory(),
        transport.clone(),
    );

    assert!(session.wait_until_open(Duration::from_secs(5)).await);
    peer.inbound.send(vehicle_update(FOCAL, 12.98, 77.60)).unwrap();
    wait_until(|| session.status().source == DataSource::Live).await;

    drop(peer);
    wait_until(|| session.status().source == DataSource::Simulated).await;
    assert_eq!(session.status().fleet_size, 5);

    // The reconnect attempt is refused and surfaces the advisory.
    wait_until(|| transport.attempts() >= 2).await;
    wait_until(|| session.status().advisory.as_deref() == Some(CONNECTION_ADVISORY)).await;

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_live_alert_is_broadcast_and_stored() {
    let transport = ScriptedTransport::default();
    let peer = transport.accept();
    let session =
        MonitoringSession::start_with_live(session_config(), FallbackStore::in_memory(), transport);
    let mut notifications = session.subscribe_alerts();

    assert!(session.wait_until_open(Duration::from_secs(5)).await);
    let frame = serde_json::json!({
        "type": "alert",
        "data": {
            "id": "A-1",
            "type": "breakdown",
            "severity": "low",
            "location": { "lat": 12.97, "lng": 77.59 },
            "vehiclesInvolved": 2,
        }
    });
    peer.inbound.send(frame.to_string()).unwrap();

    let notification = notifications.recv().await.unwrap();
    assert_eq!(notification.name(), "newAlert");
    assert_eq!(notification.alert().id, "A-1");
    assert_eq!(notification.alert().kind, AlertKind::Breakdown);
    assert_eq!(notification.alert().involved_vehicle_count, 2);
    assert_eq!(session.alerts().len(), 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_reconnecting() {
    let transport = ScriptedTransport::default();
    let session = MonitoringSession::start_with_live(
        session_config(),
        FallbackStore::in_memory(),
        transport.clone(),
    );

    wait_until(|| transport.attempts() >= 1).await;
    session.shutdown().await;
    let attempts = transport.attempts();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.attempts(), attempts);
    assert_eq!(session.connection_state(), ConnectionState::Closed);
}

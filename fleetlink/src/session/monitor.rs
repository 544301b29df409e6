//! Fleet monitor - the synchronous core of a monitoring session.
//!
//! [`FleetMonitor`] owns the fleet model, the reconciliation engine, the alert
//! list and the fallback store. It is driven by two inputs: simulation ticks
//! and batches of live events. Each input applies all of its changes first
//! and reconciles once at the end, so the nearby view is never computed from
//! a partially applied batch.
//!
//! The monitor never touches the disk while it runs. Store writes are queued
//! and handed out through [`FleetMonitor::take_writes`], so the caller can
//! apply them after releasing whatever lock guards the monitor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::alerts::{Alert, AlertNotification, FallbackStore, Notifier, SosReport, SosRequest};
use crate::fleet::{
    ConnectionState, DataSource, FleetModel, FleetSimulator, FleetStatus, NearbySet,
    ReconciliationEngine, SimulatorConfig, NEARBY_RADIUS_KM,
};
use crate::geo::GeoPoint;
use crate::live::LiveEvent;

/// Default focal vehicle id.
pub const DEFAULT_FOCAL_VEHICLE: &str = "V1234";

/// Minimum time between two writes of the focal position.
pub const POSITION_SAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a [`FleetMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// The vehicle the session is centered on.
    pub focal_id: String,

    /// Nearby radius in kilometres.
    pub radius_km: f64,

    /// Expiry for live vehicles that stop reporting; `None` keeps them forever.
    pub live_ttl: Option<Duration>,

    /// Simulated branch settings.
    pub simulator: SimulatorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            focal_id: DEFAULT_FOCAL_VEHICLE.to_string(),
            radius_km: NEARBY_RADIUS_KM,
            live_ttl: None,
            simulator: SimulatorConfig::default(),
        }
    }
}

/// A store write queued by [`FleetMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    /// Save the focal vehicle's position.
    Position(GeoPoint),
    /// Append an alert to the stored list.
    Alert(Alert),
}

/// Store writes taken from a monitor, ready to apply.
#[derive(Debug)]
pub struct PendingWrites {
    store: FallbackStore,
    writes: Vec<StoreWrite>,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }

    /// Apply the writes in order. This blocks on file I/O; failures are logged.
    pub fn apply(self) {
        for write in self.writes {
            match write {
                StoreWrite::Position(position) => {
                    if let Err(e) = self.store.save_position(position) {
                        tracing::warn!(error = %e, "Failed to store focal position");
                    }
                }
                StoreWrite::Alert(alert) => {
                    if let Err(e) = self.store.append_alert(&alert) {
                        tracing::warn!(alert_id = %alert.id, error = %e, "Failed to store alert");
                    }
                }
            }
        }
    }
}

/// Synchronous session core.
#[derive(Debug)]
pub struct FleetMonitor {
    model: FleetModel,
    engine: ReconciliationEngine,
    alerts: Vec<Alert>,
    notifier: Notifier,
    store: FallbackStore,
    pending: Vec<StoreWrite>,
    stored_position: Option<GeoPoint>,
    base: GeoPoint,
    connection: ConnectionState,
    advisory: Option<String>,
    last_position_save: Option<DateTime<Utc>>,
}

impl FleetMonitor {
    /// Create a monitor and compute the initial view.
    ///
    /// Alerts and the last position already in the store are read here, once.
    /// The connection starts `Closed`; sessions with a live link update it
    /// from [`LiveEvent::State`].
    pub fn new(config: MonitorConfig, store: FallbackStore, now: DateTime<Utc>) -> Self {
        let base = config.simulator.base;
        let simulator = FleetSimulator::new(config.simulator, &config.focal_id, now);
        let model = FleetModel::new(config.focal_id.clone(), simulator, config.live_ttl);
        let engine = ReconciliationEngine::with_radius(config.focal_id, config.radius_km);

        let alerts = store.load_alerts();
        if !alerts.is_empty() {
            tracing::info!(count = alerts.len(), "Loaded stored alerts");
        }
        let stored_position = store.load_position();

        let mut monitor = Self {
            model,
            engine,
            alerts,
            notifier: Notifier::new(),
            store,
            pending: Vec::new(),
            stored_position,
            base,
            connection: ConnectionState::Closed,
            advisory: None,
            last_position_save: None,
        };
        monitor.reconcile(now);
        monitor
    }

    /// Advance the simulation and reconcile.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Arc<NearbySet>> {
        self.model.tick(now);
        self.model.prune_stale(now);
        self.reconcile(now)
    }

    /// Apply a batch of live events in arrival order, then reconcile once.
    pub fn apply_live<I>(&mut self, events: I, now: DateTime<Utc>) -> Option<Arc<NearbySet>>
    where
        I: IntoIterator<Item = LiveEvent>,
    {
        let source_before = self.model.source();
        for event in events {
            match event {
                LiveEvent::VehicleUpdate(vehicle) => {
                    self.model.apply_live_update(vehicle);
                }
                LiveEvent::Alert(alert) => self.record_live_alert(alert),
                LiveEvent::State(state) => {
                    self.connection = state;
                    if !state.is_open() {
                        self.model.live_lost();
                    }
                }
                LiveEvent::Advisory(message) => self.advisory = message,
            }
        }
        if self.model.source() != source_before {
            // A new branch is a new data set; never hand back the old view.
            self.engine.reset();
        }
        self.model.prune_stale(now);
        self.reconcile(now)
    }

    /// Build the wire report for an SOS request.
    ///
    /// The position falls back to the last saved focal position, then to the
    /// simulation base coordinate.
    pub fn sos_report(&self, request: &SosRequest, now: DateTime<Utc>) -> SosReport {
        let fallback = self.stored_position.unwrap_or(self.base);
        request.to_report(fallback, now)
    }

    /// Take the store writes queued since the last call.
    pub fn take_writes(&mut self) -> PendingWrites {
        PendingWrites {
            store: self.store.clone(),
            writes: std::mem::take(&mut self.pending),
        }
    }

    /// Record an SOS that could not be sent: store it and broadcast `sosEmergency`.
    pub fn record_local_sos(&mut self, report: &SosReport, request: &SosRequest) -> Alert {
        let alert = Alert::from_sos(report, request.severity, request.description_or_default());
        tracing::warn!(
            alert_id = %alert.id,
            vehicle_id = %report.vehicle_id,
            kind = %alert.kind,
            "SOS not delivered, recorded locally"
        );

        self.pending.push(StoreWrite::Alert(alert.clone()));
        self.alerts.push(alert.clone());
        self.notifier.emit(AlertNotification::SosEmergency(alert.clone()));
        alert
    }

    /// Current nearby view.
    pub fn nearby(&self) -> Option<Arc<NearbySet>> {
        self.engine.current()
    }

    /// Alerts recorded this session, oldest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Notification publisher for this session.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Authoritative branch.
    pub fn source(&self) -> DataSource {
        self.model.source()
    }

    /// The fleet model.
    pub fn model(&self) -> &FleetModel {
        &self.model
    }

    /// Status snapshot.
    pub fn status(&self) -> FleetStatus {
        FleetStatus {
            connection: self.connection,
            source: self.model.source(),
            fleet_size: self.model.vehicles().len(),
            nearby_count: self.engine.current().map_or(0, |view| view.len()),
            alert_count: self.alerts.len(),
            advisory: self.advisory.clone(),
        }
    }

    fn reconcile(&mut self, now: DateTime<Utc>) -> Option<Arc<NearbySet>> {
        let view = self.engine.reconcile(self.model.vehicles());
        self.persist_focal_position(now);
        view
    }

    fn record_live_alert(&mut self, alert: Alert) {
        self.pending.push(StoreWrite::Alert(alert.clone()));
        self.alerts.push(alert.clone());
        self.notifier.emit(AlertNotification::NewAlert(alert));
    }

    fn persist_focal_position(&mut self, now: DateTime<Utc>) {
        let Some(position) = self.model.focal().map(|focal| focal.position) else {
            return;
        };

        if let Some(saved_at) = self.last_position_save {
            let since = (now - saved_at).to_std().unwrap_or_default();
            if self.stored_position == Some(position) || since < POSITION_SAVE_INTERVAL {
                return;
            }
        }

        self.pending.push(StoreWrite::Position(position));
        self.stored_position = Some(position);
        self.last_position_save = Some(now);
    }
}

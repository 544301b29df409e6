//! Fleet Model - owns both telemetry branches and picks the authoritative one.
//!
//! # Selection Logic
//!
//! 1. The simulated branch is authoritative by default.
//! 2. Once the live branch delivers an update for the focal vehicle, live
//!    becomes authoritative.
//! 3. When the live connection is lost, the model falls back to the simulated
//!    branch, which has kept ticking the whole time. It never seeds the
//!    simulation from the live snapshot.
//! 4. After a fallback, live only becomes authoritative again on a fresh focal
//!    update.
//!
//! Live vehicles that stop reporting are kept until overwritten, unless a TTL
//! is configured, in which case stale non-focal entries are pruned.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::simulator::FleetSimulator;
use super::state::{DataSource, Vehicle};

/// A producer of vehicle state.
pub trait TelemetrySource {
    /// Current vehicle set.
    fn vehicles(&self) -> &[Vehicle];

    /// Which branch this source represents.
    fn source(&self) -> DataSource;
}

impl TelemetrySource for FleetSimulator {
    fn vehicles(&self) -> &[Vehicle] {
        self.fleet()
    }

    fn source(&self) -> DataSource {
        DataSource::Simulated
    }
}

/// Vehicles received over the live connection, upserted by id.
///
/// Insertion order is preserved; an update replaces the record in place.
#[derive(Debug, Default)]
pub struct LiveFleet {
    vehicles: Vec<Vehicle>,
}

impl LiveFleet {
    /// Create an empty live set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a vehicle. Returns true if the id was new.
    pub fn upsert(&mut self, vehicle: Vehicle) -> bool {
        match self.vehicles.iter_mut().find(|v| v.id == vehicle.id) {
            Some(existing) => {
                *existing = vehicle;
                false
            }
            None => {
                self.vehicles.push(vehicle);
                true
            }
        }
    }

    /// Look up a vehicle by id.
    pub fn get(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// Remove entries not updated within `ttl`, never removing `keep_id`.
    ///
    /// Returns the number of pruned vehicles.
    pub fn prune_stale(&mut self, now: DateTime<Utc>, ttl: Duration, keep_id: &str) -> usize {
        let before = self.vehicles.len();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.vehicles.retain(|v| {
            v.id == keep_id || (now - v.last_updated).num_milliseconds() <= ttl_ms
        });
        before - self.vehicles.len()
    }

    /// Number of live vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Check if no live vehicle has been received.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl TelemetrySource for LiveFleet {
    fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    fn source(&self) -> DataSource {
        DataSource::Live
    }
}

/// Fleet Model - the simulated and live branches plus the switchover policy.
#[derive(Debug)]
pub struct FleetModel {
    focal_id: String,
    simulator: FleetSimulator,
    live: LiveFleet,
    authoritative: DataSource,
    live_ttl: Option<Duration>,
}

impl FleetModel {
    /// Create a model around a simulator. `live_ttl` of `None` never expires.
    pub fn new(
        focal_id: impl Into<String>,
        simulator: FleetSimulator,
        live_ttl: Option<Duration>,
    ) -> Self {
        Self {
            focal_id: focal_id.into(),
            simulator,
            live: LiveFleet::new(),
            authoritative: DataSource::Simulated,
            live_ttl: live_ttl.filter(|ttl| !ttl.is_zero()),
        }
    }

    /// The focal vehicle id.
    pub fn focal_id(&self) -> &str {
        &self.focal_id
    }

    /// Which branch is currently authoritative.
    pub fn source(&self) -> DataSource {
        self.authoritative
    }

    /// Advance the simulated branch. It ticks even while live is authoritative.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.simulator.tick(now);
    }

    /// Apply one decoded live update.
    ///
    /// Returns true if this update switched the model to the live branch.
    pub fn apply_live_update(&mut self, vehicle: Vehicle) -> bool {
        let is_focal = vehicle.id == self.focal_id;
        self.live.upsert(vehicle);

        if is_focal && self.authoritative == DataSource::Simulated {
            self.authoritative = DataSource::Live;
            tracing::info!(focal_id = %self.focal_id, "Live data is now authoritative");
            return true;
        }
        false
    }

    /// The live branch errored or closed: fall back to the simulation.
    ///
    /// Returns true if the model was on the live branch.
    pub fn live_lost(&mut self) -> bool {
        if self.authoritative == DataSource::Live {
            self.authoritative = DataSource::Simulated;
            tracing::info!(
                focal_id = %self.focal_id,
                "Live data lost, resuming simulated fleet"
            );
            return true;
        }
        false
    }

    /// Prune stale live vehicles according to the configured TTL.
    pub fn prune_stale(&mut self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.live_ttl else {
            return 0;
        };
        let pruned = self.live.prune_stale(now, ttl, &self.focal_id);
        if pruned > 0 {
            tracing::debug!(pruned, ttl_secs = ttl.as_secs(), "Pruned stale live vehicles");
        }
        pruned
    }

    /// The authoritative branch.
    pub fn authoritative_source(&self) -> &dyn TelemetrySource {
        match self.authoritative {
            DataSource::Simulated => &self.simulator,
            DataSource::Live => &self.live,
        }
    }

    /// The authoritative vehicle set.
    pub fn vehicles(&self) -> &[Vehicle] {
        self.authoritative_source().vehicles()
    }

    /// The authoritative focal vehicle, if present.
    pub fn focal(&self) -> Option<&Vehicle> {
        self.vehicles().iter().find(|v| v.id == self.focal_id)
    }

    /// The simulated branch.
    pub fn simulator(&self) -> &FleetSimulator {
        &self.simulator
    }

    /// The live branch.
    pub fn live(&self) -> &LiveFleet {
        &self.live
    }
}

//! Fleet Telemetry Module
//!
//! Maintains the working set of vehicles around one focal vehicle and the
//! derived "nearby" view consumed by dashboards.
//!
//! # Architecture
//!
//! Two interchangeable [`TelemetrySource`]s feed the [`FleetModel`]:
//!
//! - **Simulated** - [`FleetSimulator`] perturbs a synthetic fleet on every tick
//! - **Live** - [`LiveFleet`] holds vehicles upserted from the live connection
//!
//! The model decides which branch is authoritative. The
//! [`ReconciliationEngine`] turns the authoritative set into a [`NearbySet`]
//! and only publishes a new one when membership or rounded distances change.
//!
//! # Components
//!
//! - [`state`] - Core types: `Vehicle`, `DataSource`, `ConnectionState`, `FleetStatus`
//! - [`simulator`] - `generate_fleet`, `advance` and the stateful `FleetSimulator`
//! - [`model`] - `FleetModel` with the simulated/live switchover policy
//! - [`reconcile`] - `compute_nearby` and `ReconciliationEngine`
//! - [`provider`] - `FleetProvider` and `FleetBroadcaster` traits
//! - [`logger`] - Periodic fleet logging daemon

mod logger;
mod model;
mod provider;
mod reconcile;
mod simulator;
mod state;

pub use logger::{spawn_fleet_logger, DEFAULT_LOG_INTERVAL};
pub use model::{FleetModel, LiveFleet, TelemetrySource};
pub use provider::{FleetBroadcaster, FleetProvider};
pub use reconcile::{compute_nearby, NearbySet, ReconciliationEngine, NEARBY_RADIUS_KM};
pub use simulator::{
    advance, generate_fleet, FleetSimulator, SimulatorConfig, DEFAULT_BASE_POSITION,
    DEFAULT_FLEET_SIZE, DEFAULT_SPREAD_DEG, MAX_FLEET_SIZE,
};
pub use state::{ConnectionState, DataSource, FleetStatus, Vehicle, DEFAULT_BATTERY, MAX_SPEED_KMH};

//! Default values for every configuration key.

use super::settings::*;
use crate::fleet::{
    DEFAULT_BASE_POSITION, DEFAULT_FLEET_SIZE, DEFAULT_SPREAD_DEG, MAX_FLEET_SIZE,
    NEARBY_RADIUS_KM,
};
use crate::live::{
    Environment, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DEVELOPMENT_URL, DEFAULT_PRODUCTION_URL,
    DEFAULT_RECONNECT_DELAY_SECS,
};
use crate::session::DEFAULT_FOCAL_VEHICLE;

// =============================================================================
// Simulation
// =============================================================================

/// Default simulation tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Smallest accepted tick interval in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 50;

/// Clamp a configured fleet size to the supported range.
pub(super) fn clamp_fleet_size(value: usize) -> usize {
    value.clamp(1, MAX_FLEET_SIZE)
}

// =============================================================================
// Paths
// =============================================================================

/// Name of the store directory under the config directory.
pub const STORE_DIRECTORY_NAME: &str = "store";

/// Name of the default log file under the config directory.
pub const LOG_FILE_NAME: &str = "fleetlink.log";

// =============================================================================
// ConfigFile::default()
// =============================================================================

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = super::file::config_directory();

        Self {
            live: LiveSettings {
                enabled: true,
                environment: Environment::Development,
                development_url: DEFAULT_DEVELOPMENT_URL.to_string(),
                production_url: DEFAULT_PRODUCTION_URL.to_string(),
                reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            simulation: SimulationSettings {
                fleet_size: DEFAULT_FLEET_SIZE,
                tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
                base_lat: DEFAULT_BASE_POSITION.lat,
                base_lng: DEFAULT_BASE_POSITION.lng,
                spread_deg: DEFAULT_SPREAD_DEG,
                seed: None,
            },
            monitor: MonitorSettings {
                focal_vehicle: DEFAULT_FOCAL_VEHICLE.to_string(),
                nearby_radius_km: NEARBY_RADIUS_KM,
                live_ttl_secs: 0,
            },
            store: StoreSettings {
                directory: config_dir.join(STORE_DIRECTORY_NAME),
            },
            logging: LoggingSettings {
                file: config_dir.join(LOG_FILE_NAME),
            },
        }
    }
}

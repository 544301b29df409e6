//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. Values are
//! kept in their file units (seconds, milliseconds) and converted on demand.

use std::path::PathBuf;
use std::time::Duration;

use crate::fleet::SimulatorConfig;
use crate::geo::GeoPoint;
use crate::live::{Environment, LiveConfig};
use crate::session::{MonitorConfig, SessionConfig};

/// User configuration loaded from `config.ini`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub live: LiveSettings,
    pub simulation: SimulationSettings,
    pub monitor: MonitorSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

/// Live link configuration.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Connect to the telemetry server at all.
    pub enabled: bool,
    pub environment: Environment,
    pub development_url: String,
    pub production_url: String,
    /// Seconds between a close and the next connection attempt.
    pub reconnect_delay_secs: u64,
    /// Seconds allowed for one connection attempt.
    pub connect_timeout_secs: u64,
}

/// Simulated fleet configuration.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Vehicles in the simulated fleet, focal included.
    pub fleet_size: usize,
    pub tick_interval_ms: u64,
    pub base_lat: f64,
    pub base_lng: f64,
    /// Maximum offset from the base coordinate in degrees.
    pub spread_deg: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

/// Nearby view configuration.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub focal_vehicle: String,
    pub nearby_radius_km: f64,
    /// Expiry for silent live vehicles; 0 never expires.
    pub live_ttl_secs: u64,
}

/// Local fallback store configuration.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Directory holding one JSON file per key.
    pub directory: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl ConfigFile {
    /// Simulator settings as a [`SimulatorConfig`].
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            fleet_size: self.simulation.fleet_size,
            base: GeoPoint::new(self.simulation.base_lat, self.simulation.base_lng),
            spread_deg: self.simulation.spread_deg,
            tick_interval: Duration::from_millis(self.simulation.tick_interval_ms),
            seed: self.simulation.seed,
        }
    }

    /// Monitor settings as a [`MonitorConfig`].
    pub fn monitor_config(&self) -> MonitorConfig {
        let live_ttl = match self.monitor.live_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        MonitorConfig {
            focal_id: self.monitor.focal_vehicle.clone(),
            radius_km: self.monitor.nearby_radius_km,
            live_ttl,
            simulator: self.simulator_config(),
        }
    }

    /// Live settings as a [`LiveConfig`] subscribed to the focal vehicle.
    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            enabled: self.live.enabled,
            environment: self.live.environment,
            development_url: self.live.development_url.clone(),
            production_url: self.live.production_url.clone(),
            vehicle_id: Some(self.monitor.focal_vehicle.clone()),
            reconnect_delay: Duration::from_secs(self.live.reconnect_delay_secs),
            connect_timeout: Duration::from_secs(self.live.connect_timeout_secs),
        }
    }

    /// Everything a [`crate::session::MonitoringSession`] needs.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            monitor: self.monitor_config(),
            tick_interval: Duration::from_millis(self.simulation.tick_interval_ms),
            live: self.live_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_never_expires() {
        let mut config = ConfigFile::default();
        assert!(config.monitor_config().live_ttl.is_none());

        config.monitor.live_ttl_secs = 30;
        assert_eq!(
            config.monitor_config().live_ttl,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_live_config_subscribes_focal_vehicle() {
        let mut config = ConfigFile::default();
        config.monitor.focal_vehicle = "V0042".to_string();
        config.live.environment = Environment::Production;

        let live = config.live_config();
        assert_eq!(live.vehicle_id.as_deref(), Some("V0042"));
        assert_eq!(live.url(), config.live.production_url);
        assert_eq!(live.reconnect_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_session_config_carries_tick_interval() {
        let mut config = ConfigFile::default();
        config.simulation.tick_interval_ms = 5000;

        let session = config.session_config();
        assert_eq!(session.tick_interval, Duration::from_secs(5));
        assert_eq!(
            session.monitor.simulator.tick_interval,
            Duration::from_secs(5)
        );
    }
}

//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let seed = config
        .simulation
        .seed
        .map(|s| s.to_string())
        .unwrap_or_default();

    format!(
        r#"[live]
; Connect to the telemetry server. When disabled (or unreachable) the
; dashboard runs on the simulated fleet.
enabled = {}
; Which endpoint to use: development or production
environment = {}
development_url = {}
production_url = {}
; Seconds to wait before reconnecting after the connection closes
reconnect_delay_secs = {}
; Seconds allowed for one connection attempt
connect_timeout_secs = {}

[simulation]
; Number of simulated vehicles, focal vehicle included (1-1000)
fleet_size = {}
; Milliseconds between simulation ticks
tick_interval_ms = {}
; Coordinate the simulated fleet is generated around
base_lat = {}
base_lng = {}
; Maximum offset from the base coordinate in degrees (0.045 is roughly 5 km)
spread_deg = {}
; Fixed seed for a reproducible fleet (empty = random)
seed = {}

[monitor]
; Vehicle the nearby view is centered on
focal_vehicle = {}
; Radius of the nearby view in kilometres
nearby_radius_km = {}
; Drop live vehicles that have not reported for this many seconds (0 = never)
live_ttl_secs = {}

[store]
; Local fallback store for alerts and the last known position
directory = {}

[logging]
file = {}
"#,
        config.live.enabled,
        config.live.environment,
        config.live.development_url,
        config.live.production_url,
        config.live.reconnect_delay_secs,
        config.live.connect_timeout_secs,
        config.simulation.fleet_size,
        config.simulation.tick_interval_ms,
        config.simulation.base_lat,
        config.simulation.base_lng,
        config.simulation.spread_deg,
        seed,
        config.monitor.focal_vehicle,
        config.monitor.nearby_radius_km,
        config.monitor.live_ttl_secs,
        path_to_string(&config.store.directory),
        path_to_string(&config.logging.file),
    )
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use crate::live::Environment;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.live.enabled = false;
        config.live.environment = Environment::Production;
        config.simulation.seed = Some(7);
        config.simulation.fleet_size = 12;
        config.simulation.base_lat = 48.8566;
        config.monitor.focal_vehicle = "V0007".to_string();
        config.monitor.live_ttl_secs = 60;
        config.store.directory = temp_dir.path().join("store");

        config.save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert!(!loaded.live.enabled);
        assert_eq!(loaded.live.environment, Environment::Production);
        assert_eq!(loaded.simulation.seed, Some(7));
        assert_eq!(loaded.simulation.fleet_size, 12);
        assert_eq!(loaded.simulation.base_lat, 48.8566);
        assert_eq!(loaded.monitor.focal_vehicle, "V0007");
        assert_eq!(loaded.monitor.live_ttl_secs, 60);
        assert_eq!(loaded.store.directory, temp_dir.path().join("store"));
    }

    #[test]
    fn test_default_round_trip_keeps_entropy_seed() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert!(loaded.simulation.seed.is_none());
        assert_eq!(loaded.simulation.spread_deg, 0.045);
        assert_eq!(loaded.monitor.nearby_radius_km, 2.0);
    }
}

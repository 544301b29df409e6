//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Parsing starts from `ConfigFile::default()` and overlays present keys;
//! empty values keep the default.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::{clamp_fleet_size, MIN_TICK_INTERVAL_MS};
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::live::Environment;

/// Parse an `Ini` object into a `ConfigFile`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [live] section
    if let Some(section) = ini.section(Some("live")) {
        if let Some(v) = value(section, "enabled") {
            config.live.enabled = parse_bool(v);
        }
        if let Some(v) = value(section, "environment") {
            config.live.environment =
                Environment::parse(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "live".to_string(),
                    key: "environment".to_string(),
                    value: v.to_string(),
                    reason: "must be one of: development, production".to_string(),
                })?;
        }
        if let Some(v) = value(section, "development_url") {
            config.live.development_url = parse_url("development_url", v)?;
        }
        if let Some(v) = value(section, "production_url") {
            config.live.production_url = parse_url("production_url", v)?;
        }
        if let Some(v) = value(section, "reconnect_delay_secs") {
            config.live.reconnect_delay_secs = parse_positive("live", "reconnect_delay_secs", v)?;
        }
        if let Some(v) = value(section, "connect_timeout_secs") {
            config.live.connect_timeout_secs = parse_positive("live", "connect_timeout_secs", v)?;
        }
    }

    // [simulation] section
    if let Some(section) = ini.section(Some("simulation")) {
        if let Some(v) = value(section, "fleet_size") {
            let size: usize = parse_number("simulation", "fleet_size", v, "a positive integer")?;
            let clamped = clamp_fleet_size(size);
            if clamped != size {
                tracing::warn!(
                    configured = size,
                    using = clamped,
                    "simulation.fleet_size out of range, clamped"
                );
            }
            config.simulation.fleet_size = clamped;
        }
        if let Some(v) = value(section, "tick_interval_ms") {
            let ms: u64 = parse_number("simulation", "tick_interval_ms", v, "milliseconds")?;
            if ms < MIN_TICK_INTERVAL_MS {
                return Err(ConfigFileError::InvalidValue {
                    section: "simulation".to_string(),
                    key: "tick_interval_ms".to_string(),
                    value: v.to_string(),
                    reason: format!("must be at least {} ms", MIN_TICK_INTERVAL_MS),
                });
            }
            config.simulation.tick_interval_ms = ms;
        }
        if let Some(v) = value(section, "base_lat") {
            config.simulation.base_lat = parse_coordinate("base_lat", v, 90.0)?;
        }
        if let Some(v) = value(section, "base_lng") {
            config.simulation.base_lng = parse_coordinate("base_lng", v, 180.0)?;
        }
        if let Some(v) = value(section, "spread_deg") {
            let spread: f64 = parse_number("simulation", "spread_deg", v, "degrees")?;
            if !(spread.is_finite() && spread >= 0.0) {
                return Err(ConfigFileError::InvalidValue {
                    section: "simulation".to_string(),
                    key: "spread_deg".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative number of degrees".to_string(),
                });
            }
            config.simulation.spread_deg = spread;
        }
        if let Some(v) = value(section, "seed") {
            config.simulation.seed = Some(parse_number("simulation", "seed", v, "an integer")?);
        }
    }

    // [monitor] section
    if let Some(section) = ini.section(Some("monitor")) {
        if let Some(v) = value(section, "focal_vehicle") {
            config.monitor.focal_vehicle = v.to_string();
        }
        if let Some(v) = value(section, "nearby_radius_km") {
            let radius: f64 = parse_number("monitor", "nearby_radius_km", v, "kilometres")?;
            if !(radius.is_finite() && radius > 0.0) {
                return Err(ConfigFileError::InvalidValue {
                    section: "monitor".to_string(),
                    key: "nearby_radius_km".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive number of kilometres".to_string(),
                });
            }
            config.monitor.nearby_radius_km = radius;
        }
        if let Some(v) = value(section, "live_ttl_secs") {
            config.monitor.live_ttl_secs =
                parse_number("monitor", "live_ttl_secs", v, "seconds (0 disables expiry)")?;
        }
    }

    // [store] section
    if let Some(section) = ini.section(Some("store")) {
        if let Some(v) = value(section, "directory") {
            config.store.directory = expand_tilde(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = value(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

/// A trimmed, non-empty value for `key`.
fn value<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    expected: &str,
) -> Result<T, ConfigFileError> {
    value.parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: format!("expected {}", expected),
    })
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    match parse_number::<u64>(section, key, value, "a positive integer (seconds)")? {
        0 => Err(ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be a positive integer (seconds)".to_string(),
        }),
        secs => Ok(secs),
    }
}

fn parse_coordinate(key: &str, value: &str, limit: f64) -> Result<f64, ConfigFileError> {
    let degrees: f64 = parse_number("simulation", key, value, "decimal degrees")?;
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(ConfigFileError::InvalidValue {
            section: "simulation".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("must be between -{} and {}", limit, limit),
        });
    }
    Ok(degrees)
}

fn parse_url(key: &str, value: &str) -> Result<String, ConfigFileError> {
    if value.starts_with("ws://") || value.starts_with("wss://") {
        Ok(value.to_string())
    } else {
        Err(ConfigFileError::InvalidValue {
            section: "live".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: "must start with ws:// or wss://".to_string(),
        })
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

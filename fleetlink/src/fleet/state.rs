//! Core state types for fleet telemetry.
//!
//! - [`Vehicle`] - One vehicle's position, speed and battery
//! - [`DataSource`] - Which branch produced the vehicle set
//! - [`ConnectionState`] - Live connection lifecycle
//! - [`FleetStatus`] - Snapshot for consumers (dashboards, logger)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Upper bound for simulated speeds in km/h. Live reports are not capped.
pub const MAX_SPEED_KMH: f64 = 120.0;

/// Battery level reported when a payload omits it.
pub const DEFAULT_BATTERY: f64 = 100.0;

/// A vehicle in the working set.
///
/// Exactly one vehicle per working set is the focal vehicle; the focal id is
/// owned by whoever holds the set, not by the vehicle itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Identity, unique within a fleet.
    pub id: String,

    /// Current position.
    pub position: GeoPoint,

    /// Speed in km/h (>= 0).
    pub speed: f64,

    /// Battery level, 0 to 100.
    pub battery: f64,

    /// Distance from the focal vehicle in km, rounded to 2 decimals.
    ///
    /// Only present once computed by reconciliation (0 for the focal vehicle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_focal: Option<f64>,

    /// When this record was last updated.
    pub last_updated: DateTime<Utc>,
}

impl Vehicle {
    /// Create a vehicle record.
    ///
    /// Negative or non-finite speeds become 0 and battery is clamped into
    /// `[0, 100]`. There is no upper speed bound here; reported speeds are
    /// kept as sent.
    pub fn new(
        id: impl Into<String>,
        position: GeoPoint,
        speed: f64,
        battery: f64,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            speed: floor_speed(speed),
            battery: clamp_battery(battery),
            distance_from_focal: None,
            last_updated,
        }
    }

    /// Whether the vehicle is stationary.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        self.speed == 0.0
    }

    /// Builder-style setter for the focal distance.
    pub fn with_distance(mut self, km: f64) -> Self {
        self.distance_from_focal = Some(km);
        self
    }
}

/// Map negative and non-finite speeds to 0.
fn floor_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        0.0
    }
}

/// Clamp a battery level into `[0, 100]`, mapping NaN to the default.
fn clamp_battery(battery: f64) -> f64 {
    if battery.is_nan() {
        return DEFAULT_BATTERY;
    }
    battery.clamp(0.0, 100.0)
}

/// Which branch currently supplies the authoritative vehicle set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataSource {
    /// Locally generated synthetic fleet.
    #[default]
    Simulated,
    /// Vehicle updates received over the live connection.
    Live,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => write!(f, "Simulated"),
            Self::Live => write!(f, "Live"),
        }
    }
}

/// Live connection lifecycle.
///
/// `Connecting -> Open -> Closed -> Reconnecting -> Connecting -> ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    #[default]
    Connecting,
    /// Connected and subscribed.
    Open,
    /// The connection closed (or was disposed).
    Closed,
    /// Waiting for the reconnect delay to elapse.
    Reconnecting,
}

impl ConnectionState {
    /// Check whether frames can be sent.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

/// Fleet status snapshot for consumers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FleetStatus {
    /// Live connection state (`Closed` when running offline).
    pub connection: ConnectionState,

    /// Branch that produced the current view.
    pub source: DataSource,

    /// Size of the authoritative vehicle set.
    pub fleet_size: usize,

    /// Number of vehicles in the nearby view, focal included.
    pub nearby_count: usize,

    /// Number of alerts recorded this session.
    pub alert_count: usize,

    /// Latest advisory message from the live connection, if any.
    pub advisory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(speed: f64, battery: f64) -> Vehicle {
        Vehicle::new("V1", GeoPoint::new(1.0, 2.0), speed, battery, Utc::now())
    }

    #[test]
    fn test_vehicle_new_clamps_values() {
        let v = vehicle(250.0, 140.0);
        assert_eq!(v.speed, 250.0);
        assert_eq!(v.battery, 100.0);

        let v = vehicle(-5.0, -1.0);
        assert_eq!(v.speed, 0.0);
        assert_eq!(v.battery, 0.0);
        assert!(v.is_stationary());
    }

    #[test]
    fn test_vehicle_nan_values() {
        let v = vehicle(f64::NAN, f64::NAN);
        assert_eq!(v.speed, 0.0);
        assert_eq!(v.battery, DEFAULT_BATTERY);

        assert_eq!(vehicle(f64::INFINITY, 50.0).speed, 0.0);
    }

    #[test]
    fn test_vehicle_serializes_camel_case() {
        let v = vehicle(10.0, 50.0).with_distance(1.25);
        let json = serde_json::to_value(&v).unwrap();

        assert_eq!(json["id"], "V1");
        assert_eq!(json["position"]["lat"], 1.0);
        assert_eq!(json["distanceFromFocal"], 1.25);
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_distance_omitted_until_computed() {
        let json = serde_json::to_value(vehicle(10.0, 50.0)).unwrap();
        assert!(json.get("distanceFromFocal").is_none());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::Open.to_string(), "Open");
        assert_eq!(ConnectionState::Closed.to_string(), "Closed");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "Reconnecting");
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Reconnecting.is_open());
    }

    #[test]
    fn test_data_source_default() {
        assert_eq!(DataSource::default(), DataSource::Simulated);
        assert_eq!(DataSource::Live.to_string(), "Live");
    }
}

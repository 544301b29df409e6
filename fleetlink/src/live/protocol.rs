//! Live wire protocol.
//!
//! Every frame is a JSON object with a `type` discriminator:
//!
//! - Outbound `subscribe` - `{type, target: "vehicle"|"all_vehicles"|"alerts", id?}`
//! - Outbound `sos_report` - `{type, data: {id, vehicle_id, alert_type, location, timestamp}}`
//! - Inbound `vehicle_update` - `{type, data: <vehicle payload>}`
//! - Inbound `alert` - `{type, data: <alert payload>}`
//!
//! Vehicle payloads arrive in one of two shapes, both normalized to
//! [`Vehicle`]:
//!
//! | External              | Internal       |
//! |-----------------------|----------------|
//! | `vehicle_id`          | `id`           |
//! | `location.{lat,lng}`  | `position`     |
//! | `speed`               | `speed`        |
//! | `battery` (opt, 100)  | `battery`      |

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{DecodeError, LiveError};
use crate::alerts::{Alert, AlertKind, Severity, SosReport};
use crate::fleet::{Vehicle, DEFAULT_BATTERY};
use crate::geo::GeoPoint;

/// What a subscription frame asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTarget {
    Vehicle,
    AllVehicles,
    Alerts,
}

/// A frame sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Subscribe {
        target: SubscriptionTarget,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    SosReport {
        data: SosReport,
    },
}

impl OutboundFrame {
    /// The two subscriptions sent on every open: vehicles, then alerts.
    pub fn subscriptions(vehicle_id: Option<&str>) -> [OutboundFrame; 2] {
        let vehicles = match vehicle_id {
            Some(id) => OutboundFrame::Subscribe {
                target: SubscriptionTarget::Vehicle,
                id: Some(id.to_string()),
            },
            None => OutboundFrame::Subscribe {
                target: SubscriptionTarget::AllVehicles,
                id: None,
            },
        };
        let alerts = OutboundFrame::Subscribe {
            target: SubscriptionTarget::Alerts,
            id: None,
        };
        [vehicles, alerts]
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, LiveError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    VehicleUpdate(Vehicle),
    Alert(Alert),
    /// A frame whose `type` is not handled; carries the type.
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Parse one text frame.
///
/// Only frames that are not JSON objects with a string `type` are errors;
/// payloads are decoded leniently.
pub fn parse_frame(text: &str, now: DateTime<Utc>) -> Result<InboundFrame, DecodeError> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedFrame(e.to_string()))?;

    Ok(match raw.kind.as_str() {
        "vehicle_update" => InboundFrame::VehicleUpdate(decode_vehicle_lossy(&raw.data, now)),
        "alert" => InboundFrame::Alert(decode_alert(&raw.data, now)),
        _ => InboundFrame::Unknown(raw.kind),
    })
}

// ============================================================================
// Vehicle payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct InternalVehicle {
    id: String,
    position: GeoPoint,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    battery: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExternalVehicle {
    vehicle_id: String,
    location: GeoPoint,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    battery: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VehiclePayload {
    Internal(InternalVehicle),
    External(ExternalVehicle),
}

/// Decode a vehicle payload in either shape.
///
/// A missing `speed` is 0 and a missing `battery` is 100. Reported speeds
/// are kept except that negative values become 0. `last_updated` is always
/// set to `now`.
pub fn decode_vehicle(data: &Value, now: DateTime<Utc>) -> Result<Vehicle, DecodeError> {
    let payload = VehiclePayload::deserialize(data)
        .map_err(|_| DecodeError::UnrecognizedShape(data.to_string()))?;

    let (id, position, speed, battery) = match payload {
        VehiclePayload::Internal(v) => (v.id, v.position, v.speed, v.battery),
        VehiclePayload::External(v) => (v.vehicle_id, v.location, v.speed, v.battery),
    };

    if !position.is_finite() {
        return Err(DecodeError::InvalidField {
            field: "position",
            reason: format!("non-finite coordinate ({})", position),
        });
    }

    Ok(Vehicle::new(
        id,
        position,
        speed.unwrap_or(0.0),
        battery.unwrap_or(DEFAULT_BATTERY),
        now,
    ))
}

/// Decode a vehicle payload, producing a best-effort record on failure.
///
/// The fallback uses `id`, then `vehicle_id`, then `"unknown"`, the first of
/// `position`/`location` that parses (else `(0, 0)`), and battery 100.
pub fn decode_vehicle_lossy(data: &Value, now: DateTime<Utc>) -> Vehicle {
    match decode_vehicle(data, now) {
        Ok(vehicle) => vehicle,
        Err(e) => {
            tracing::warn!(error = %e, "Unrecognized vehicle payload, using best-effort record");

            let id = str_field(data, &["id", "vehicle_id"]).unwrap_or("unknown");
            let position = point_field(data, &["position", "location"]).unwrap_or_default();
            let speed = data.get("speed").and_then(Value::as_f64).unwrap_or(0.0);
            let battery = data
                .get("battery")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_BATTERY);

            Vehicle::new(id, position, speed, battery, now)
        }
    }
}

// ============================================================================
// Alert payloads
// ============================================================================

/// Decode an alert payload. Never fails.
///
/// Accepts `time` or `timestamp` (RFC 3339 or unix millis), `position` or
/// `location`, and `vehiclesInvolved` or `involvedVehicleCount`. Missing
/// fields default to: id `alert-<millis>`, type `other`, severity Medium,
/// time `now`, position `(0, 0)`, one vehicle, empty description.
pub fn decode_alert(data: &Value, now: DateTime<Utc>) -> Alert {
    let id = match data.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("alert-{}", now.timestamp_millis()),
    };

    let kind = str_field(data, &["type"])
        .map(AlertKind::from)
        .unwrap_or_else(|| AlertKind::Other("other".to_string()));

    let severity = str_field(data, &["severity"])
        .map(Severity::parse_lenient)
        .unwrap_or_default();

    let timestamp = ["time", "timestamp"]
        .iter()
        .filter_map(|key| data.get(*key))
        .find_map(parse_timestamp)
        .unwrap_or(now);

    let position = point_field(data, &["position", "location"]).unwrap_or_else(|| {
        tracing::debug!(alert_id = %id, "Alert without position");
        GeoPoint::default()
    });

    let involved_vehicle_count = ["vehiclesInvolved", "involvedVehicleCount"]
        .iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_u64))
        .next()
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(1);

    let description = str_field(data, &["description"]).unwrap_or_default().to_string();

    Alert {
        id,
        kind,
        severity,
        position,
        timestamp,
        description,
        involved_vehicle_count,
    }
}

fn str_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| data.get(*key).and_then(Value::as_str))
        .next()
}

fn point_field(data: &Value, keys: &[&str]) -> Option<GeoPoint> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .filter_map(|value| GeoPoint::deserialize(value).ok())
        .find(GeoPoint::is_finite)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

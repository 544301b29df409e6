//! Alert, severity and SOS report types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Description used when an SOS request carries none.
pub const DEFAULT_SOS_DESCRIPTION: &str = "SOS Emergency Button Pressed";

/// Canonical alert severity.
///
/// Producers use several vocabularies; [`Severity::parse_lenient`] maps them
/// all onto this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl Severity {
    /// Map any known severity word onto the canonical enum.
    ///
    /// | Input (case-insensitive)       | Severity |
    /// |--------------------------------|----------|
    /// | `low`, `minor`                 | Low      |
    /// | `medium`, `moderate`, `major`  | Medium   |
    /// | `high`, `severe`, `critical`   | High     |
    ///
    /// Returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "minor" => Some(Self::Low),
            "medium" | "moderate" | "major" => Some(Self::Medium),
            "high" | "severe" | "critical" => Some(Self::High),
            _ => None,
        }
    }

    /// Like [`Severity::parse`], falling back to `Medium` with a diagnostic.
    pub fn parse_lenient(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(severity = value, "Unknown alert severity, using Medium");
            Self::Medium
        })
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Alert taxonomy. Server-pushed types outside the known set are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertKind {
    #[default]
    Collision,
    Medical,
    Breakdown,
    Other(String),
}

impl AlertKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Collision => "collision",
            Self::Medical => "medical",
            Self::Breakdown => "breakdown",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for AlertKind {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "collision" => Self::Collision,
            "medical" => Self::Medical,
            "breakdown" => Self::Breakdown,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl From<String> for AlertKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<AlertKind> for String {
    fn from(kind: AlertKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accident or SOS report. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: AlertKind,

    pub severity: Severity,

    pub position: GeoPoint,

    pub timestamp: DateTime<Utc>,

    pub description: String,

    pub involved_vehicle_count: u32,
}

impl Alert {
    /// Build the local alert recorded when an SOS report could not be sent.
    pub fn from_sos(report: &SosReport, severity: Severity, description: &str) -> Self {
        Self {
            id: report.id.clone(),
            kind: report.alert_type.clone(),
            severity,
            position: report.location,
            timestamp: report.timestamp,
            description: description.to_string(),
            involved_vehicle_count: 1,
        }
    }
}

/// Outbound SOS report, the `data` of a `sos_report` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosReport {
    pub id: String,
    pub vehicle_id: String,
    pub alert_type: AlertKind,
    pub location: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

/// A request to raise an SOS for a vehicle.
///
/// Missing fields are filled in when the report is built: the position falls
/// back to the stored focal position, then to the base coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct SosRequest {
    pub vehicle_id: String,
    pub alert_type: AlertKind,
    pub severity: Severity,
    pub description: Option<String>,
    pub position: Option<GeoPoint>,
}

impl SosRequest {
    /// A collision report of High severity for `vehicle_id`.
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            alert_type: AlertKind::Collision,
            severity: Severity::High,
            description: None,
            position: None,
        }
    }

    pub fn with_type(mut self, alert_type: AlertKind) -> Self {
        self.alert_type = alert_type;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_position(mut self, position: GeoPoint) -> Self {
        self.position = Some(position);
        self
    }

    /// Description to record, falling back to the default text.
    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_SOS_DESCRIPTION)
    }

    /// Build the wire report. The id is `sos-<unix millis>`.
    pub fn to_report(&self, fallback_position: GeoPoint, now: DateTime<Utc>) -> SosReport {
        SosReport {
            id: format!("sos-{}", now.timestamp_millis()),
            vehicle_id: self.vehicle_id.clone(),
            alert_type: self.alert_type.clone(),
            location: self.position.unwrap_or(fallback_position),
            timestamp: now,
        }
    }
}

/// Result of submitting an SOS request.
#[derive(Debug, Clone, PartialEq)]
pub enum SosOutcome {
    /// Sent over the open live connection.
    Delivered(SosReport),
    /// Not sent; recorded as a local alert and broadcast.
    StoredLocally(Alert),
}

impl SosOutcome {
    /// Check whether the report reached the live connection.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        for word in ["low", "Minor", "LOW"] {
            assert_eq!(Severity::parse(word), Some(Severity::Low), "{}", word);
        }
        for word in ["Medium", "moderate", "major"] {
            assert_eq!(Severity::parse(word), Some(Severity::Medium), "{}", word);
        }
        for word in ["high", "Severe", "critical"] {
            assert_eq!(Severity::parse(word), Some(Severity::High), "{}", word);
        }
        assert_eq!(Severity::parse("apocalyptic"), None);
        assert_eq!(Severity::parse_lenient("apocalyptic"), Severity::Medium);
    }

    #[test]
    fn test_alert_kind_round_trip_through_string() {
        assert_eq!(AlertKind::from("Collision"), AlertKind::Collision);
        assert_eq!(AlertKind::from("medical"), AlertKind::Medical);
        assert_eq!(
            AlertKind::from("Road Hazard"),
            AlertKind::Other("Road Hazard".to_string())
        );
        assert_eq!(String::from(AlertKind::Breakdown), "breakdown");
    }

    #[test]
    fn test_alert_serializes_with_type_key() {
        let alert = Alert {
            id: "a1".to_string(),
            kind: AlertKind::Medical,
            severity: Severity::High,
            position: GeoPoint::new(1.0, 2.0),
            timestamp: Utc::now(),
            description: "test".to_string(),
            involved_vehicle_count: 2,
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "medical");
        assert_eq!(json["severity"], "High");
        assert_eq!(json["involvedVehicleCount"], 2);

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_sos_request_defaults() {
        let request = SosRequest::new("V1234");
        assert_eq!(request.alert_type, AlertKind::Collision);
        assert_eq!(request.severity, Severity::High);
        assert_eq!(request.description_or_default(), DEFAULT_SOS_DESCRIPTION);
        assert_eq!(
            SosRequest::new("V1").with_description("  ").description_or_default(),
            DEFAULT_SOS_DESCRIPTION
        );
    }

    #[test]
    fn test_to_report_uses_fallback_position() {
        let now = Utc::now();
        let fallback = GeoPoint::new(12.9716, 77.5946);
        let report = SosRequest::new("V1234").to_report(fallback, now);

        assert_eq!(report.id, format!("sos-{}", now.timestamp_millis()));
        assert_eq!(report.location, fallback);

        let explicit = GeoPoint::new(1.0, 1.0);
        let report = SosRequest::new("V1234")
            .with_position(explicit)
            .to_report(fallback, now);
        assert_eq!(report.location, explicit);
    }

    #[test]
    fn test_sos_report_wire_shape() {
        let report = SosRequest::new("V1234")
            .with_type(AlertKind::Breakdown)
            .to_report(GeoPoint::new(1.0, 2.0), Utc::now());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["vehicle_id"], "V1234");
        assert_eq!(json["alert_type"], "breakdown");
        assert_eq!(json["location"]["lng"], 2.0);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_local_alert_from_sos() {
        let report = SosRequest::new("V1234")
            .with_type(AlertKind::Medical)
            .to_report(GeoPoint::new(1.0, 2.0), Utc::now());
        let alert = Alert::from_sos(&report, Severity::Low, "help");

        assert_eq!(alert.id, report.id);
        assert_eq!(alert.kind, AlertKind::Medical);
        assert_eq!(alert.involved_vehicle_count, 1);
        assert_eq!(alert.description, "help");
    }
}

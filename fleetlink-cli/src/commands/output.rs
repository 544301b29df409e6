//! Terminal formatting shared by the monitor and simulate commands.

use fleetlink::alerts::Alert;
use fleetlink::fleet::{FleetStatus, NearbySet};

/// Render the nearby set as a table, focal vehicle first.
pub fn nearby_table(view: &NearbySet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:>10} {:>10} {:>8} {:>8} {:>9}\n",
        "ID", "LAT", "LNG", "KM/H", "BATT%", "DIST KM"
    ));
    for vehicle in &view.vehicles {
        let marker = if vehicle.id == view.focal_id { "*" } else { "" };
        let distance = vehicle
            .distance_from_focal
            .map(|km| format!("{:.2}", km))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<8} {:>10.5} {:>10.5} {:>8.1} {:>8.0} {:>9}\n",
            format!("{}{}", vehicle.id, marker),
            vehicle.position.lat,
            vehicle.position.lng,
            vehicle.speed,
            vehicle.battery,
            distance
        ));
    }
    out
}

/// One-line status summary.
pub fn status_line(status: &FleetStatus) -> String {
    let mut line = format!(
        "source={:?} connection={:?} fleet={} nearby={} alerts={}",
        status.source,
        status.connection,
        status.fleet_size,
        status.nearby_count.saturating_sub(1),
        status.alert_count
    );
    if let Some(advisory) = &status.advisory {
        line.push_str(&format!(" ({})", advisory));
    }
    line
}

/// One-line alert summary.
pub fn alert_line(alert: &Alert) -> String {
    format!(
        "[{}] {} {} at {} ({} vehicle(s)): {}",
        alert.timestamp.format("%H:%M:%S"),
        alert.severity,
        alert.kind,
        alert.position,
        alert.involved_vehicle_count,
        alert.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleetlink::fleet::{compute_nearby, Vehicle};
    use fleetlink::geo::GeoPoint;

    #[test]
    fn test_nearby_table_marks_focal() {
        let now = Utc::now();
        let fleet = vec![
            Vehicle::new("V1234", GeoPoint::new(12.9716, 77.5946), 30.0, 80.0, now),
            Vehicle::new("V0002", GeoPoint::new(12.9747, 77.6094), 10.0, 50.0, now),
        ];
        let view = NearbySet {
            focal_id: "V1234".to_string(),
            vehicles: compute_nearby(&fleet, "V1234", 2.0).unwrap(),
        };

        let table = nearby_table(&view);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("V1234*"));
        assert!(lines[2].contains("1.64"));
    }
}

//! Distance command - Haversine distance between two coordinates.

use fleetlink::geo::distance_km;

use crate::error::CliError;

/// Run the distance command.
pub fn run(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<(), CliError> {
    for (name, lat) in [("LAT1", lat1), ("LAT2", lat2)] {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CliError::InvalidArgument(format!(
                "{} must be between -90 and 90",
                name
            )));
        }
    }
    for (name, lon) in [("LON1", lon1), ("LON2", lon2)] {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CliError::InvalidArgument(format!(
                "{} must be between -180 and 180",
                name
            )));
        }
    }

    println!("{:.4} km", distance_km(lat1, lon1, lat2, lon2));
    Ok(())
}

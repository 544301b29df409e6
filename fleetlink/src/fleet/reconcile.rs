//! Nearby-set reconciliation.
//!
//! Computes which vehicles are within a fixed radius of the focal vehicle and
//! keeps the published view referentially stable: when membership and rounded
//! distances are unchanged, the previous [`Arc<NearbySet>`] is returned as is,
//! so consumers can compare with [`Arc::ptr_eq`] and skip redundant redraws.

use std::sync::Arc;

use super::state::Vehicle;
use crate::geo::round_km;

/// Radius of the nearby set in kilometres.
pub const NEARBY_RADIUS_KM: f64 = 2.0;

/// The published nearby view.
///
/// The focal vehicle is always first, with a distance of 0. The remaining
/// vehicles keep the order of the input set.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySet {
    /// Focal vehicle id.
    pub focal_id: String,

    /// Focal vehicle followed by every vehicle within the radius.
    pub vehicles: Vec<Vehicle>,
}

impl NearbySet {
    /// The focal vehicle.
    pub fn focal(&self) -> Option<&Vehicle> {
        self.vehicles.first()
    }

    /// Vehicles other than the focal one.
    pub fn others(&self) -> &[Vehicle] {
        self.vehicles.get(1..).unwrap_or_default()
    }

    /// Number of vehicles in the view, focal included.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Check if the view is empty (never true for a computed set).
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Same ids in the same order with the same rounded distances.
    fn same_shape(&self, other: &[Vehicle]) -> bool {
        self.vehicles.len() == other.len()
            && self
                .vehicles
                .iter()
                .zip(other)
                .all(|(a, b)| a.id == b.id && a.distance_from_focal == b.distance_from_focal)
    }
}

/// Compute the nearby set relative to `focal_id`.
///
/// Returns `None` if the focal vehicle is not in `all`. Distances are attached
/// rounded to 2 decimals; inclusion is decided on the unrounded value.
pub fn compute_nearby(all: &[Vehicle], focal_id: &str, radius_km: f64) -> Option<Vec<Vehicle>> {
    let focal = all.iter().find(|v| v.id == focal_id)?;

    let mut nearby = Vec::with_capacity(all.len());
    nearby.push(focal.clone().with_distance(0.0));

    for vehicle in all.iter().filter(|v| v.id != focal_id) {
        let km = focal.position.distance_km(&vehicle.position);
        if km <= radius_km {
            nearby.push(vehicle.clone().with_distance(round_km(km)));
        }
    }

    Some(nearby)
}

/// Reconciliation engine - owns the last published view.
#[derive(Debug)]
pub struct ReconciliationEngine {
    focal_id: String,
    radius_km: f64,
    current: Option<Arc<NearbySet>>,
}

impl ReconciliationEngine {
    /// Create an engine with the default 2 km radius.
    pub fn new(focal_id: impl Into<String>) -> Self {
        Self::with_radius(focal_id, NEARBY_RADIUS_KM)
    }

    /// Create an engine with a custom radius.
    pub fn with_radius(focal_id: impl Into<String>, radius_km: f64) -> Self {
        Self {
            focal_id: focal_id.into(),
            radius_km,
            current: None,
        }
    }

    /// Focal vehicle id.
    pub fn focal_id(&self) -> &str {
        &self.focal_id
    }

    /// Radius in kilometres.
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// The last published view.
    pub fn current(&self) -> Option<Arc<NearbySet>> {
        self.current.clone()
    }

    /// Recompute the view from a full vehicle set.
    ///
    /// If the focal vehicle is missing, the previous view is kept. If the
    /// recomputed view has the same shape as the previous one, the previous
    /// `Arc` is returned unchanged.
    pub fn reconcile(&mut self, all: &[Vehicle]) -> Option<Arc<NearbySet>> {
        let Some(vehicles) = compute_nearby(all, &self.focal_id, self.radius_km) else {
            tracing::debug!(
                focal_id = %self.focal_id,
                "Focal vehicle missing, keeping previous view"
            );
            return self.current.clone();
        };

        if let Some(current) = &self.current {
            if current.same_shape(&vehicles) {
                return Some(Arc::clone(current));
            }
        }

        tracing::trace!(
            focal_id = %self.focal_id,
            nearby = vehicles.len() - 1,
            "Nearby view changed"
        );
        let view = Arc::new(NearbySet {
            focal_id: self.focal_id.clone(),
            vehicles,
        });
        self.current = Some(Arc::clone(&view));
        Some(view)
    }

    /// Drop the published view.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

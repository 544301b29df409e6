//! Simulated telemetry branch.
//!
//! Produces a plausible, continuously evolving fleet around a seed coordinate
//! without any backing service. Both [`generate_fleet`] and [`advance`] are
//! pure transforms over an explicit RNG and clock, so a seeded
//! [`FleetSimulator`] replays identically.
//!
//! Motion is a random jitter scaled by the distance a vehicle could have
//! covered since its last update, not a directed heading.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::state::{Vehicle, MAX_SPEED_KMH};
use crate::geo::{round_km, GeoPoint};

/// Default seed coordinate (Bangalore city centre).
pub const DEFAULT_BASE_POSITION: GeoPoint = GeoPoint::new(12.9716, 77.5946);

/// Default positional spread around the seed, in degrees (~5 km).
pub const DEFAULT_SPREAD_DEG: f64 = 0.045;

/// Default simulated fleet size.
pub const DEFAULT_FLEET_SIZE: usize = 50;

/// Upper bound on simulated fleet size.
pub const MAX_FLEET_SIZE: usize = 1000;

/// Degrees of jitter per kilometre travelled (0.00001° per metre).
const JITTER_DEG_PER_KM: f64 = 0.01;

/// Probability that a moving vehicle's speed changes on a given tick.
const SPEED_WALK_PROBABILITY: f64 = 0.1;

/// Maximum speed change per random-walk step, in km/h.
const SPEED_WALK_STEP_KMH: f64 = 5.0;

/// Configuration for the fleet simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of vehicles, focal included.
    pub fleet_size: usize,

    /// Seed coordinate; the focal vehicle starts here.
    pub base: GeoPoint,

    /// Maximum offset from the seed in each axis, in degrees.
    pub spread_deg: f64,

    /// Interval between simulation ticks.
    pub tick_interval: Duration,

    /// RNG seed for reproducible fleets; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            fleet_size: DEFAULT_FLEET_SIZE,
            base: DEFAULT_BASE_POSITION,
            spread_deg: DEFAULT_SPREAD_DEG,
            tick_interval: Duration::from_secs(1),
            seed: None,
        }
    }
}

/// Round to two decimals (speeds are reported at 0.01 km/h resolution).
fn round2(value: f64) -> f64 {
    round_km(value)
}

/// Generate a fleet of `count` vehicles around `seed`.
///
/// The focal vehicle is pinned at `seed` with a focal distance of 0. Other
/// vehicles get unique `Vnnnn` ids, a position within `±spread_deg` of the
/// seed in both axes, a speed in `[0, 120)` km/h and a battery in `[0, 100)`.
/// A `count` of zero still yields the focal vehicle.
pub fn generate_fleet<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    focal_id: &str,
    seed: GeoPoint,
    spread_deg: f64,
    now: DateTime<Utc>,
) -> Vec<Vehicle> {
    let count = count.clamp(1, MAX_FLEET_SIZE);
    let spread = spread_deg.abs();
    let mut vehicles = Vec::with_capacity(count);
    let mut used: HashSet<String> = HashSet::with_capacity(count);

    let focal = Vehicle::new(
        focal_id,
        seed,
        rng.gen_range(0..120) as f64,
        rng.gen_range(0..100) as f64,
        now,
    )
    .with_distance(0.0);
    used.insert(focal.id.clone());
    vehicles.push(focal);

    while vehicles.len() < count {
        let id = format!("V{:04}", rng.gen_range(0..10_000));
        if !used.insert(id.clone()) {
            continue;
        }

        let position = if spread > 0.0 {
            GeoPoint::new(
                seed.lat + rng.gen_range(-spread..=spread),
                seed.lng + rng.gen_range(-spread..=spread),
            )
        } else {
            seed
        };

        vehicles.push(Vehicle::new(
            id,
            position,
            round2(rng.gen::<f64>() * MAX_SPEED_KMH),
            rng.gen_range(0..100) as f64,
            now,
        ));
    }

    vehicles
}

/// Advance every vehicle to `now`.
///
/// Stationary vehicles only get a new `last_updated`. Moving vehicles are
/// displaced by random jitter proportional to `speed * elapsed`, and with
/// 10% probability their speed takes a ±5 km/h step clamped to `[0, 120]`.
pub fn advance<R: Rng + ?Sized>(
    rng: &mut R,
    fleet: &[Vehicle],
    now: DateTime<Utc>,
) -> Vec<Vehicle> {
    fleet
        .iter()
        .map(|vehicle| {
            if vehicle.is_stationary() {
                return Vehicle {
                    last_updated: now,
                    ..vehicle.clone()
                };
            }

            let elapsed_secs =
                (now - vehicle.last_updated).num_milliseconds().max(0) as f64 / 1000.0;
            let travelled_km = vehicle.speed / 3600.0 * elapsed_secs;

            let lat_change = (rng.gen::<f64>() - 0.5) * JITTER_DEG_PER_KM * travelled_km;
            let lng_change = (rng.gen::<f64>() - 0.5) * JITTER_DEG_PER_KM * travelled_km;

            let speed = if rng.gen_bool(SPEED_WALK_PROBABILITY) {
                let step = (rng.gen::<f64>() - 0.5) * 2.0 * SPEED_WALK_STEP_KMH;
                round2((vehicle.speed + step).clamp(0.0, MAX_SPEED_KMH))
            } else {
                vehicle.speed
            };

            Vehicle {
                position: GeoPoint::new(
                    vehicle.position.lat + lat_change,
                    vehicle.position.lng + lng_change,
                ),
                speed,
                last_updated: now,
                ..vehicle.clone()
            }
        })
        .collect()
}

/// Stateful wrapper that owns the RNG and the current simulated fleet.
#[derive(Debug)]
pub struct FleetSimulator {
    rng: StdRng,
    fleet: Vec<Vehicle>,
    config: SimulatorConfig,
}

impl FleetSimulator {
    /// Generate the initial fleet for `focal_id`.
    pub fn new(config: SimulatorConfig, focal_id: &str, now: DateTime<Utc>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fleet = generate_fleet(
            &mut rng,
            config.fleet_size,
            focal_id,
            config.base,
            config.spread_deg,
            now,
        );

        tracing::debug!(
            fleet_size = fleet.len(),
            focal_id,
            base = %config.base,
            seeded = config.seed.is_some(),
            "Simulated fleet generated"
        );

        Self { rng, fleet, config }
    }

    /// Advance the fleet to `now` and return the new snapshot.
    pub fn tick(&mut self, now: DateTime<Utc>) -> &[Vehicle] {
        self.fleet = advance(&mut self.rng, &self.fleet, now);
        &self.fleet
    }

    /// Current simulated snapshot.
    pub fn fleet(&self) -> &[Vehicle] {
        &self.fleet
    }

    /// Configuration used by this simulator.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_generate_fleet_pins_focal_at_seed() {
        let now = Utc::now();
        let fleet = generate_fleet(&mut rng(1), 5, "V1234", DEFAULT_BASE_POSITION, 0.045, now);

        assert_eq!(fleet.len(), 5);
        let focal = &fleet[0];
        assert_eq!(focal.id, "V1234");
        assert_eq!(focal.position, DEFAULT_BASE_POSITION);
        assert_eq!(focal.distance_from_focal, Some(0.0));
    }

    #[test]
    fn test_generate_fleet_bounds_and_unique_ids() {
        let now = Utc::now();
        let fleet = generate_fleet(&mut rng(7), 200, "V0001", DEFAULT_BASE_POSITION, 0.045, now);

        let ids: HashSet<&str> = fleet.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids.len(), fleet.len(), "ids must be unique");

        for v in &fleet[1..] {
            assert!((v.position.lat - DEFAULT_BASE_POSITION.lat).abs() <= 0.045);
            assert!((v.position.lng - DEFAULT_BASE_POSITION.lng).abs() <= 0.045);
            assert!((0.0..=120.0).contains(&v.speed));
            assert!((0.0..100.0).contains(&v.battery));
            assert!(v.distance_from_focal.is_none());
        }
    }

    #[test]
    fn test_generate_fleet_zero_count_keeps_focal() {
        let fleet = generate_fleet(&mut rng(3), 0, "F", DEFAULT_BASE_POSITION, 0.045, Utc::now());
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet[0].id, "F");
    }

    #[test]
    fn test_generate_fleet_is_deterministic_with_seed() {
        let now = Utc::now();
        let a = generate_fleet(&mut rng(42), 10, "V1234", DEFAULT_BASE_POSITION, 0.045, now);
        let b = generate_fleet(&mut rng(42), 10, "V1234", DEFAULT_BASE_POSITION, 0.045, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_advance_stationary_vehicle_keeps_position() {
        let start = Utc::now();
        let vehicle = Vehicle::new("V1", DEFAULT_BASE_POSITION, 0.0, 50.0, start);
        let later = start + ChronoDuration::seconds(30);

        let advanced = advance(&mut rng(5), &[vehicle.clone()], later);

        assert_eq!(advanced[0].position, vehicle.position);
        assert_eq!(advanced[0].speed, 0.0);
        assert_eq!(advanced[0].last_updated, later);
    }

    #[test]
    fn test_advance_displacement_is_bounded() {
        let start = Utc::now();
        let mut r = rng(9);
        for speed in [1.0, 30.0, 60.0, 120.0] {
            let vehicle = Vehicle::new("V1", DEFAULT_BASE_POSITION, speed, 50.0, start);
            for secs in [1, 5, 60, 600] {
                let later = start + ChronoDuration::seconds(secs);
                let advanced = advance(&mut r, std::slice::from_ref(&vehicle), later);

                let travelled_km = speed / 3600.0 * secs as f64;
                let moved_km = vehicle.position.distance_km(&advanced[0].position);
                assert!(
                    moved_km <= travelled_km + 1e-9,
                    "moved {} km, bound {} km",
                    moved_km,
                    travelled_km
                );
            }
        }
    }

    #[test]
    fn test_advance_speed_walk_stays_in_range() {
        let start = Utc::now();
        let mut fleet = vec![
            Vehicle::new("A", DEFAULT_BASE_POSITION, 1.0, 50.0, start),
            Vehicle::new("B", DEFAULT_BASE_POSITION, 119.0, 50.0, start),
        ];
        let mut r = rng(11);
        for i in 1..=500 {
            fleet = advance(&mut r, &fleet, start + ChronoDuration::seconds(i));
            for v in &fleet {
                assert!((0.0..=MAX_SPEED_KMH).contains(&v.speed), "speed {}", v.speed);
            }
        }
    }

    #[test]
    fn test_advance_clock_going_backwards_does_not_move() {
        let start = Utc::now();
        let vehicle = Vehicle::new("V1", DEFAULT_BASE_POSITION, 100.0, 50.0, start);
        let earlier = start - ChronoDuration::seconds(10);

        let advanced = advance(&mut rng(2), &[vehicle.clone()], earlier);
        assert_eq!(advanced[0].position, vehicle.position);
    }

    #[test]
    fn test_simulator_seeded_replay() {
        let config = SimulatorConfig {
            fleet_size: 8,
            seed: Some(99),
            ..Default::default()
        };
        let now = Utc::now();
        let mut a = FleetSimulator::new(config.clone(), "V1234", now);
        let mut b = FleetSimulator::new(config, "V1234", now);

        let later = now + ChronoDuration::seconds(1);
        assert_eq!(a.tick(later), b.tick(later));
        assert_eq!(a.fleet().len(), 8);
    }
}

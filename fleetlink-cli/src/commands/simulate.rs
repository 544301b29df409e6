//! Simulate command - generate and advance a fleet offline.
//!
//! Uses no network and no store, so a fixed seed gives the same output on
//! every run.

use chrono::Utc;
use fleetlink::fleet::{FleetSimulator, ReconciliationEngine};

use super::output::nearby_table;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub vehicle: Option<String>,
    pub count: Option<usize>,
    pub seed: Option<u64>,
    pub ticks: u32,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let mut runner = CliRunner::new()?;
    runner.log_startup("simulate");

    let config = runner.config_mut();
    if let Some(vehicle) = args.vehicle {
        config.monitor.focal_vehicle = vehicle;
    }
    if let Some(count) = args.count {
        if count == 0 || count > fleetlink::fleet::MAX_FLEET_SIZE {
            return Err(CliError::InvalidArgument(format!(
                "--count must be between 1 and {}",
                fleetlink::fleet::MAX_FLEET_SIZE
            )));
        }
        config.simulation.fleet_size = count;
    }
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }

    let monitor = config.monitor_config();
    let step = chrono::Duration::from_std(monitor.simulator.tick_interval)
        .map_err(|e| CliError::Config(e.to_string()))?;

    let mut now = Utc::now();
    let mut simulator = FleetSimulator::new(monitor.simulator.clone(), &monitor.focal_id, now);
    let mut engine = ReconciliationEngine::with_radius(monitor.focal_id.clone(), monitor.radius_km);

    for _ in 0..args.ticks {
        now += step;
        simulator.tick(now);
    }

    println!(
        "Fleet of {} vehicles after {} tick(s), radius {} km",
        simulator.fleet().len(),
        args.ticks,
        monitor.radius_km
    );
    match engine.reconcile(simulator.fleet()) {
        Some(view) => print!("{}", nearby_table(&view)),
        None => println!("Focal vehicle {} not in fleet", monitor.focal_id),
    }

    Ok(())
}

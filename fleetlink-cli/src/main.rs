//! FleetLink CLI - Command-line interface
//!
//! This binary provides a command-line interface to the FleetLink library:
//! a terminal monitor for the nearby-vehicle view, an offline simulator, SOS
//! submission and configuration management.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::monitor::MonitorArgs;
use commands::simulate::SimulateArgs;
use commands::sos::SosArgs;

#[derive(Parser)]
#[command(name = "fleetlink")]
#[command(version = fleetlink::VERSION)]
#[command(about = "Monitor nearby vehicles from simulated and live fleet telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the vehicles near the focal vehicle
    Monitor {
        /// Focal vehicle id (default: monitor.focal_vehicle from config)
        #[arg(long)]
        vehicle: Option<String>,

        /// Do not connect to the telemetry server
        #[arg(long)]
        offline: bool,

        /// Seed for a reproducible simulated fleet
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Generate a simulated fleet offline and print the nearby set
    Simulate {
        /// Focal vehicle id
        #[arg(long)]
        vehicle: Option<String>,

        /// Number of vehicles, focal included
        #[arg(long)]
        count: Option<usize>,

        /// Seed for a reproducible fleet
        #[arg(long)]
        seed: Option<u64>,

        /// Simulation ticks to run before printing
        #[arg(long, default_value = "0")]
        ticks: u32,
    },

    /// Submit an SOS report, storing it locally if the server is unreachable
    Sos {
        /// Reporting vehicle id (default: monitor.focal_vehicle from config)
        #[arg(long)]
        vehicle: Option<String>,

        /// Alert type (collision, medical, breakdown, or any other label)
        #[arg(long = "type", default_value = "collision")]
        alert_type: String,

        /// Severity: low, medium or high
        #[arg(long, default_value = "high")]
        severity: String,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,

        /// Seconds to wait for the server connection
        #[arg(long, default_value = "5")]
        wait: u64,

        /// Do not connect to the telemetry server
        #[arg(long)]
        offline: bool,
    },

    /// Print the great-circle distance between two coordinates in km
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat1: f64,
        #[arg(allow_negative_numbers = true)]
        lon1: f64,
        #[arg(allow_negative_numbers = true)]
        lat2: f64,
        #[arg(allow_negative_numbers = true)]
        lon2: f64,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Monitor {
            vehicle,
            offline,
            seed,
            duration,
            debug,
        } => commands::monitor::run(MonitorArgs {
            vehicle,
            offline,
            seed,
            duration,
            debug,
        }),
        Commands::Simulate {
            vehicle,
            count,
            seed,
            ticks,
        } => commands::simulate::run(SimulateArgs {
            vehicle,
            count,
            seed,
            ticks,
        }),
        Commands::Sos {
            vehicle,
            alert_type,
            severity,
            description,
            wait,
            offline,
        } => commands::sos::run(SosArgs {
            vehicle,
            alert_type,
            severity,
            description,
            wait,
            offline,
        }),
        Commands::Distance {
            lat1,
            lon1,
            lat2,
            lon2,
        } => commands::distance::run(lat1, lon1, lat2, lon2),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_distance_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "fleetlink", "distance", "-33.86", "151.2", "-33.87", "151.21",
        ])
        .unwrap();
        match cli.command {
            Commands::Distance { lat1, lon2, .. } => {
                assert_eq!(lat1, -33.86);
                assert_eq!(lon2, 151.21);
            }
            _ => panic!("expected distance command"),
        }
    }

    #[test]
    fn test_parse_sos_defaults() {
        let cli = Cli::try_parse_from(["fleetlink", "sos"]).unwrap();
        match cli.command {
            Commands::Sos {
                alert_type,
                severity,
                wait,
                ..
            } => {
                assert_eq!(alert_type, "collision");
                assert_eq!(severity, "high");
                assert_eq!(wait, 5);
            }
            _ => panic!("expected sos command"),
        }
    }
}

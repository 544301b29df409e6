//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (path, show, init)
//! - [`distance`] - Haversine distance between two coordinates
//! - [`monitor`] - Live nearby-vehicle monitor
//! - [`simulate`] - Offline, deterministic fleet simulation
//! - [`sos`] - Submit an SOS report

pub mod config;
pub mod distance;
pub mod monitor;
pub mod output;
pub mod simulate;
pub mod sos;

//! FleetLink - Real-time vehicle telemetry for V2V fleet monitoring
//!
//! This library keeps a dashboard's view of nearby vehicles consistent while
//! telemetry arrives from two sources: a local fleet simulator that always
//! runs, and a live WebSocket feed that takes over whenever it reports the
//! focal vehicle.
//!
//! # High-Level API
//!
//! The [`session`] module provides the facade most consumers need:
//!
//! ```ignore
//! use fleetlink::alerts::{FallbackStore, SosRequest};
//! use fleetlink::config::ConfigFile;
//! use fleetlink::live::WebSocketTransport;
//! use fleetlink::session::MonitoringSession;
//!
//! let config = ConfigFile::load()?;
//! let store = FallbackStore::open(&config.store.directory);
//! let session =
//!     MonitoringSession::start_with_live(config.session_config(), store, WebSocketTransport);
//!
//! let outcome = session.submit_sos(SosRequest::new("V1234")).await;
//! session.shutdown().await;
//! ```
//!
//! # Modules
//!
//! - [`geo`]: Haversine distance
//! - [`fleet`]: vehicle records, the simulator, and nearby reconciliation
//! - [`alerts`]: alert records, notifications, and the fallback store
//! - [`live`]: wire protocol, connection supervisor, and WebSocket link
//! - [`session`]: the monitoring session tying it all together

pub mod alerts;
pub mod config;
pub mod fleet;
pub mod geo;
pub mod live;
pub mod logging;
pub mod session;

/// Version of the FleetLink library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

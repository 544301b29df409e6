//! Live Connection Module
//!
//! Receives authoritative vehicle updates and alerts from a WebSocket server
//! and submits SOS reports to it.
//!
//! # Architecture
//!
//! ```text
//! Transport ──► LiveLink (select! loop) ──► LiveEvent (mpsc) ──► session
//!                   │
//!                   ▼
//!          ConnectionSupervisor (pure state machine)
//! ```
//!
//! The link retries forever with a fixed delay; failures surface only as an
//! advisory string and the connection state.
//!
//! # Components
//!
//! - [`config`] - `LiveConfig`, `Environment` and endpoint defaults
//! - [`protocol`] - Frame types and the tolerant vehicle/alert decoders
//! - [`supervisor`] - `ConnectionSupervisor` state machine
//! - [`schedule`] - `ScheduledTask`, a single-instance cancellable timer
//! - [`transport`] - `Transport`/`Connection` traits and `WebSocketTransport`
//! - [`link`] - `LiveLink` driver and `LiveHandle`

mod config;
mod error;
mod link;
mod protocol;
mod schedule;
mod supervisor;
mod transport;

pub use config::{
    Environment, LiveConfig, CONNECTION_ADVISORY, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_DEVELOPMENT_URL, DEFAULT_PRODUCTION_URL, DEFAULT_RECONNECT_DELAY_SECS,
};
pub use error::{DecodeError, LiveError};
pub use link::{LiveEvent, LiveHandle, LiveLink};
pub use protocol::{
    decode_alert, decode_vehicle, decode_vehicle_lossy, parse_frame, InboundFrame, OutboundFrame,
    SubscriptionTarget,
};
pub use schedule::ScheduledTask;
pub use supervisor::{ConnectionSupervisor, SupervisorAction};
pub use transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};

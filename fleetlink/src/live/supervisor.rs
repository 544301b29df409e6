//! Connection supervisor - the live connection state machine.
//!
//! The supervisor performs no I/O. Each event method returns the
//! [`SupervisorAction`]s the driver must carry out, in order, which keeps the
//! state machine fully testable without sockets or timers.
//!
//! ```text
//! Connecting --open--> Open --close--> Closed -> Reconnecting
//!     ^                                              |
//!     +------------------- timer --------------------+
//! ```
//!
//! Errors never change the state; the close that follows them does. Once
//! disposed, every event is ignored.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::config::{LiveConfig, CONNECTION_ADVISORY};
use super::protocol::{parse_frame, InboundFrame, OutboundFrame};
use crate::alerts::Alert;
use crate::fleet::{ConnectionState, Vehicle};

/// An effect requested by the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorAction {
    /// Open a connection to `url`.
    Connect { url: String },
    /// Send a frame on the open connection.
    Send(OutboundFrame),
    /// Arm the reconnect timer.
    ScheduleReconnect(Duration),
    /// Disarm the reconnect timer.
    CancelReconnect,
    /// Close the open connection.
    Close,
    /// Upsert a decoded vehicle into the live set.
    Upsert(Vehicle),
    /// Record and announce an alert.
    Alert(Alert),
    /// The connection state changed.
    StateChanged(ConnectionState),
    /// The advisory message changed (`None` clears it).
    Advisory(Option<String>),
}

/// Live connection state machine.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    config: LiveConfig,
    state: ConnectionState,
    reconnect_pending: bool,
    disposed: bool,
    advisory: Option<String>,
    /// Connection attempts since the last successful open.
    attempts: u32,
}

impl ConnectionSupervisor {
    /// Create a supervisor in the `Connecting` state.
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Connecting,
            reconnect_pending: false,
            disposed: false,
            advisory: None,
            attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current advisory message.
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    /// Connection attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Check whether a reconnect is scheduled.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Check whether the supervisor has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Check whether a frame may be sent now.
    pub fn can_send(&self) -> bool {
        !self.disposed && self.state.is_open()
    }

    /// Begin the first connection attempt.
    pub fn start(&mut self) -> Vec<SupervisorAction> {
        if self.disposed {
            return Vec::new();
        }
        self.attempts += 1;
        tracing::info!(url = %self.config.url(), "Connecting to live server");
        vec![SupervisorAction::Connect {
            url: self.config.url().to_string(),
        }]
    }

    /// The connection opened: go `Open` and subscribe.
    pub fn on_open(&mut self) -> Vec<SupervisorAction> {
        if self.disposed {
            return vec![SupervisorAction::Close];
        }

        tracing::info!(
            url = %self.config.url(),
            attempts = self.attempts,
            "Live connection established"
        );
        self.attempts = 0;

        let mut actions = self.transition(ConnectionState::Open);
        if self.advisory.take().is_some() {
            actions.push(SupervisorAction::Advisory(None));
        }
        actions.extend(
            OutboundFrame::subscriptions(self.config.vehicle_id.as_deref())
                .into_iter()
                .map(SupervisorAction::Send),
        );
        actions
    }

    /// A text frame arrived.
    pub fn on_text(&mut self, text: &str, now: DateTime<Utc>) -> Vec<SupervisorAction> {
        if !self.can_send() {
            tracing::trace!(state = %self.state, "Ignoring frame outside Open state");
            return Vec::new();
        }

        match parse_frame(text, now) {
            Ok(InboundFrame::VehicleUpdate(vehicle)) => {
                tracing::trace!(vehicle_id = %vehicle.id, "Vehicle update");
                vec![SupervisorAction::Upsert(vehicle)]
            }
            Ok(InboundFrame::Alert(alert)) => {
                tracing::info!(
                    alert_id = %alert.id,
                    kind = %alert.kind,
                    severity = %alert.severity,
                    "Alert received"
                );
                vec![SupervisorAction::Alert(alert)]
            }
            Ok(InboundFrame::Unknown(kind)) => {
                tracing::debug!(kind = %kind, "Ignoring unhandled frame type");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse live frame");
                self.set_advisory(e.to_string())
            }
        }
    }

    /// A transport error occurred. Records the advisory only.
    pub fn on_error(&mut self, error: &str) -> Vec<SupervisorAction> {
        if self.disposed {
            return Vec::new();
        }
        tracing::warn!(error, state = %self.state, "Live connection error");
        self.set_advisory(CONNECTION_ADVISORY.to_string())
    }

    /// The connection closed: schedule exactly one reconnect.
    pub fn on_close(&mut self) -> Vec<SupervisorAction> {
        if self.disposed || self.reconnect_pending {
            return Vec::new();
        }

        let delay = self.config.reconnect_delay;
        tracing::info!(
            delay_secs = delay.as_secs(),
            attempts = self.attempts,
            "Live connection closed, reconnecting"
        );

        let mut actions = self.transition(ConnectionState::Closed);
        actions.extend(self.transition(ConnectionState::Reconnecting));
        self.reconnect_pending = true;
        actions.push(SupervisorAction::ScheduleReconnect(delay));
        actions
    }

    /// A connection attempt failed before opening: error, then close.
    pub fn on_connect_failed(&mut self, error: &str) -> Vec<SupervisorAction> {
        let mut actions = self.on_error(error);
        actions.extend(self.on_close());
        actions
    }

    /// The reconnect timer fired: start a fresh attempt.
    pub fn on_reconnect_timer(&mut self) -> Vec<SupervisorAction> {
        if self.disposed || !self.reconnect_pending {
            return Vec::new();
        }
        self.reconnect_pending = false;
        self.attempts += 1;
        tracing::debug!(attempt = self.attempts, "Attempting to reconnect");

        let mut actions = self.transition(ConnectionState::Connecting);
        actions.push(SupervisorAction::Connect {
            url: self.config.url().to_string(),
        });
        actions
    }

    /// Stop for good: cancel the timer and close if open. Idempotent.
    pub fn dispose(&mut self) -> Vec<SupervisorAction> {
        if self.disposed {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(SupervisorAction::CancelReconnect);
        }
        if self.state.is_open() {
            actions.push(SupervisorAction::Close);
        }
        actions.extend(self.transition(ConnectionState::Closed));
        self.disposed = true;

        tracing::debug!("Live connection supervisor disposed");
        actions
    }

    fn transition(&mut self, next: ConnectionState) -> Vec<SupervisorAction> {
        if self.state == next {
            return Vec::new();
        }
        tracing::debug!(from = %self.state, to = %next, "Connection state change");
        self.state = next;
        vec![SupervisorAction::StateChanged(next)]
    }

    fn set_advisory(&mut self, message: String) -> Vec<SupervisorAction> {
        if self.advisory.as_deref() == Some(message.as_str()) {
            return Vec::new();
        }
        self.advisory = Some(message.clone());
        vec![SupervisorAction::Advisory(Some(message))]
    }
}

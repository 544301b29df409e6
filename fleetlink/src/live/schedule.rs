//! Single-instance cancellable timer.
//!
//! [`ScheduledTask`] holds at most one deadline. Scheduling while armed moves
//! the deadline instead of adding a second one, so callers can never end up
//! with overlapping timers. It runs on tokio time, so tests step it with
//! `tokio::time::pause` and `advance`.

use std::time::Duration;

use tokio::time::Instant;

/// A cancellable timer with a single active deadline.
#[derive(Debug, Default)]
pub struct ScheduledTask {
    deadline: Option<Instant>,
}

impl ScheduledTask {
    /// Create an unarmed task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the task to fire after `delay`. Returns true if it was already armed.
    pub fn schedule(&mut self, delay: Duration) -> bool {
        self.deadline.replace(Instant::now() + delay).is_some()
    }

    /// Disarm the task. Returns true if it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Check whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wait for the deadline, then disarm.
    ///
    /// Never completes while unarmed. Cancel-safe: dropping the future before
    /// it completes leaves the deadline in place.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

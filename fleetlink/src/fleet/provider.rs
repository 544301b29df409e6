//! Provider traits for consumers of the fleet view.
//!
//! - [`FleetProvider`] - Query API (pull)
//! - [`FleetBroadcaster`] - Subscription API (push)

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use super::reconcile::NearbySet;
use super::state::FleetStatus;
use crate::alerts::{Alert, AlertNotification};

/// Trait for querying the fleet view (pull API).
pub trait FleetProvider: Send + Sync {
    /// Get a status snapshot.
    fn status(&self) -> FleetStatus;

    /// Get the current nearby view, if one has been computed.
    fn nearby(&self) -> Option<Arc<NearbySet>>;

    /// Get every alert recorded this session, oldest first.
    fn alerts(&self) -> Vec<Alert>;
}

/// Trait for subscribing to fleet changes (push API).
pub trait FleetBroadcaster: Send + Sync {
    /// Watch the nearby view. A new value is only published when the view changes.
    fn subscribe_view(&self) -> watch::Receiver<Option<Arc<NearbySet>>>;

    /// Subscribe to alert notifications.
    fn subscribe_alerts(&self) -> broadcast::Receiver<AlertNotification>;
}

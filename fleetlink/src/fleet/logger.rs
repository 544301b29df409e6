//! Periodic fleet logging daemon.
//!
//! Logs the nearby view and connection status at a fixed interval. Output is
//! emitted at DEBUG level with structured fields:
//! - `source` - Authoritative branch (Simulated, Live)
//! - `connection` - Live connection state
//! - `fleet` - Size of the authoritative vehicle set
//! - `nearby` - Vehicles within the radius, focal excluded
//! - `alerts` - Alerts recorded this session
//! - `focal` - Focal position as `lat, lng`

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::provider::FleetProvider;

/// Default logging interval (20 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(20);

/// Spawns a background task that periodically logs the fleet view.
///
/// The task stops when `cancellation` is triggered.
///
/// ```ignore
/// if tracing::enabled!(tracing::Level::DEBUG) {
///     spawn_fleet_logger(session.clone(), cancel, DEFAULT_LOG_INTERVAL);
/// }
/// ```
pub fn spawn_fleet_logger<P>(
    provider: Arc<P>,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()>
where
    P: FleetProvider + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_fleet(provider.as_ref());
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Fleet logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_fleet<P: FleetProvider + ?Sized>(provider: &P) {
    let status = provider.status();

    match provider.nearby().as_deref().and_then(|view| view.focal().cloned()) {
        Some(focal) => {
            tracing::debug!(
                source = %status.source,
                connection = %status.connection,
                fleet = status.fleet_size,
                nearby = status.nearby_count.saturating_sub(1),
                alerts = status.alert_count,
                focal = %focal.position,
                speed_kmh = format!("{:.1}", focal.speed),
                "Fleet update"
            );
        }
        None => {
            tracing::debug!(
                source = %status.source,
                connection = %status.connection,
                "Fleet update (no focal vehicle)"
            );
        }
    }
}

//! Monitoring Session Module
//!
//! A [`MonitoringSession`] is the explicitly constructed, disposable owner of
//! everything a dashboard needs: the simulated fleet, the optional live link,
//! the nearby view and the alert list. There are no globals; create one per
//! consumer and dispose it when done.
//!
//! # Concurrency
//!
//! One task owns the [`FleetMonitor`] loop. It waits on the simulation ticker
//! and on live events; when events arrive it drains everything already queued
//! and applies the batch before reconciling. Readers see the published view
//! through a `watch` channel and the status through a short lock.
//!
//! Store writes queued by the monitor are taken while the lock is held and
//! applied on the blocking pool after it is released. One batch is applied
//! at a time so appends to the alert list never interleave.
//!
//! # Usage
//!
//! ```ignore
//! let session = MonitoringSession::start_with_live(config, store, WebSocketTransport);
//! let mut view = session.subscribe_view();
//! while view.changed().await.is_ok() {
//!     if let Some(nearby) = view.borrow().clone() {
//!         render(&nearby);
//!     }
//! }
//! session.dispose();
//! ```

mod monitor;

pub use monitor::{
    FleetMonitor, MonitorConfig, PendingWrites, StoreWrite, DEFAULT_FOCAL_VEHICLE,
    POSITION_SAVE_INTERVAL,
};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::alerts::{Alert, AlertNotification, FallbackStore, Notifier, SosOutcome, SosRequest};
use crate::fleet::{ConnectionState, FleetBroadcaster, FleetProvider, FleetStatus, NearbySet};
use crate::live::{LiveConfig, LiveEvent, LiveHandle, LiveLink, Transport};

/// Capacity of the live event channel.
const LIVE_EVENT_CAPACITY: usize = 256;

/// Configuration for a [`MonitoringSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fleet, radius and staleness settings.
    pub monitor: MonitorConfig,

    /// Simulation tick interval.
    pub tick_interval: Duration,

    /// Live link settings; used by [`MonitoringSession::start_with_live`].
    pub live: LiveConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            tick_interval: Duration::from_secs(1),
            live: LiveConfig::default(),
        }
    }
}

type SharedView = Option<Arc<NearbySet>>;

struct Shared {
    monitor: Mutex<FleetMonitor>,
    view_tx: watch::Sender<SharedView>,
    notifier: Notifier,
    store_gate: tokio::sync::Mutex<()>,
}

impl Shared {
    /// Run `f` against the monitor, then apply the writes it queued.
    async fn with_monitor<R>(&self, f: impl FnOnce(&mut FleetMonitor) -> R) -> R {
        let (result, writes) = {
            let mut monitor = self.monitor.lock();
            let result = f(&mut *monitor);
            (result, monitor.take_writes())
        };
        self.persist(writes).await;
        result
    }

    async fn persist(&self, writes: PendingWrites) {
        if writes.is_empty() {
            return;
        }
        let _gate = self.store_gate.lock().await;
        if let Err(e) = tokio::task::spawn_blocking(move || writes.apply()).await {
            tracing::warn!(error = %e, "Store write task failed");
        }
    }

    /// Publish a view unless it is the same `Arc` already published.
    fn publish(&self, view: SharedView) {
        self.view_tx.send_if_modified(|current| {
            let unchanged = match (current.as_ref(), view.as_ref()) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                *current = view;
            }
            !unchanged
        });
    }
}

/// A running monitoring session.
pub struct MonitoringSession {
    shared: Arc<Shared>,
    live: Option<LiveHandle>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MonitoringSession {
    /// Start a session on the simulated branch only.
    ///
    /// Must be called within a tokio runtime.
    pub fn start_simulated(config: SessionConfig, store: FallbackStore) -> Self {
        let cancel = CancellationToken::new();
        let shared = Self::shared(&config, store);
        let mut session = Self {
            shared,
            live: None,
            cancel,
            tasks: Mutex::new(Vec::new()),
        };
        session.spawn_loop(config.tick_interval, None);

        tracing::info!(
            focal_id = %config.monitor.focal_id,
            tick_ms = config.tick_interval.as_millis() as u64,
            "Monitoring session started (simulated)"
        );
        session
    }

    /// Start a session with a live link over `transport`.
    ///
    /// The simulated branch runs from the start and stays the fallback.
    pub fn start_with_live<T: Transport>(
        config: SessionConfig,
        store: FallbackStore,
        transport: T,
    ) -> Self {
        let cancel = CancellationToken::new();
        let shared = Self::shared(&config, store);
        shared
            .monitor
            .lock()
            .apply_live([LiveEvent::State(ConnectionState::Connecting)], Utc::now());

        let (events_tx, events_rx) = mpsc::channel(LIVE_EVENT_CAPACITY);
        let (link, handle) = LiveLink::new(
            transport,
            config.live.clone(),
            events_tx,
            cancel.child_token(),
        );

        let mut session = Self {
            shared,
            live: Some(handle),
            cancel,
            tasks: Mutex::new(Vec::new()),
        };
        session.tasks.get_mut().push(link.start());
        session.spawn_loop(config.tick_interval, Some(events_rx));

        tracing::info!(
            focal_id = %config.monitor.focal_id,
            url = %config.live.url(),
            "Monitoring session started (live)"
        );
        session
    }

    fn shared(config: &SessionConfig, store: FallbackStore) -> Arc<Shared> {
        let monitor = FleetMonitor::new(config.monitor.clone(), store, Utc::now());
        let notifier = monitor.notifier().clone();
        let (view_tx, _) = watch::channel(monitor.nearby());
        Arc::new(Shared {
            monitor: Mutex::new(monitor),
            view_tx,
            notifier,
            store_gate: tokio::sync::Mutex::new(()),
        })
    }

    fn spawn_loop(&mut self, tick_interval: Duration, events: Option<mpsc::Receiver<LiveEvent>>) {
        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let task = tokio::spawn(run_loop(shared, events, tick_interval, cancel));
        self.tasks.get_mut().push(task);
    }

    /// Submit an SOS request.
    ///
    /// Sent over the live link when it is open. Otherwise the report is
    /// recorded as a local alert, persisted, and broadcast as `sosEmergency`.
    pub async fn submit_sos(&self, request: SosRequest) -> SosOutcome {
        let report = self.shared.monitor.lock().sos_report(&request, Utc::now());

        let delivered = match &self.live {
            Some(live) if !self.is_disposed() => live.send_sos_report(report.clone()).await,
            _ => false,
        };

        if delivered {
            SosOutcome::Delivered(report)
        } else {
            let alert = self
                .shared
                .with_monitor(|monitor| monitor.record_local_sos(&report, &request))
                .await;
            SosOutcome::StoredLocally(alert)
        }
    }

    /// Current connection state (`Closed` for simulated-only sessions).
    pub fn connection_state(&self) -> ConnectionState {
        match &self.live {
            Some(live) if !self.is_disposed() => live.state(),
            _ => ConnectionState::Closed,
        }
    }

    /// Wait until the live connection is open. Returns false on timeout or
    /// for simulated-only sessions.
    pub async fn wait_until_open(&self, timeout: Duration) -> bool {
        let Some(live) = &self.live else {
            return false;
        };
        let mut state = live.subscribe_state();
        let opened = matches!(
            tokio::time::timeout(timeout, state.wait_for(ConnectionState::is_open)).await,
            Ok(Ok(_))
        );
        opened
    }

    /// Stop the session: the ticker, any pending reconnect, and an open
    /// connection. Safe to call more than once.
    pub fn dispose(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::info!("Disposing monitoring session");
        if let Some(live) = &self.live {
            live.dispose();
        }
        self.cancel.cancel();
    }

    /// Check whether [`MonitoringSession::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Dispose and wait for the background tasks to finish.
    pub async fn shutdown(&self) {
        self.dispose();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session task failed");
            }
        }
    }
}

impl FleetProvider for MonitoringSession {
    fn status(&self) -> FleetStatus {
        let mut status = self.shared.monitor.lock().status();
        if self.live.is_none() || self.is_disposed() {
            status.connection = ConnectionState::Closed;
        }
        status
    }

    fn nearby(&self) -> Option<Arc<NearbySet>> {
        self.shared.view_tx.borrow().clone()
    }

    fn alerts(&self) -> Vec<Alert> {
        self.shared.monitor.lock().alerts().to_vec()
    }
}

impl FleetBroadcaster for MonitoringSession {
    fn subscribe_view(&self) -> watch::Receiver<SharedView> {
        self.shared.view_tx.subscribe()
    }

    fn subscribe_alerts(&self) -> broadcast::Receiver<AlertNotification> {
        self.shared.notifier.subscribe()
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for MonitoringSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringSession")
            .field("live", &self.live.is_some())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    mut events: Option<mpsc::Receiver<LiveEvent>>,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Writes queued while the session was being built
    shared.with_monitor(|_| ()).await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let view = shared.with_monitor(|monitor| monitor.tick(Utc::now())).await;
                shared.publish(view);
            }
            event = recv_event(&mut events) => match event {
                Some(first) => {
                    let mut batch = vec![first];
                    if let Some(rx) = events.as_mut() {
                        while let Ok(event) = rx.try_recv() {
                            batch.push(event);
                        }
                    }
                    tracing::trace!(events = batch.len(), "Applying live batch");
                    let view = shared
                        .with_monitor(|monitor| monitor.apply_live(batch, Utc::now()))
                        .await;
                    shared.publish(view);
                }
                None => {
                    tracing::debug!("Live event channel closed");
                    events = None;
                }
            },
        }
    }

    tracing::debug!("Monitoring loop stopped");
}

async fn recv_event(events: &mut Option<mpsc::Receiver<LiveEvent>>) -> Option<LiveEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

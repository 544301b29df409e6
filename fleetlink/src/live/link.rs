//! Live link - async driver for the connection supervisor.
//!
//! [`LiveLink`] owns the transport, the open connection and the reconnect
//! timer, and executes the actions produced by [`ConnectionSupervisor`].
//! Decoded vehicles, alerts and state changes are forwarded as
//! [`LiveEvent`]s on an mpsc channel, in arrival order.
//!
//! # Design
//!
//! Follows the adapter pattern used elsewhere in the crate:
//! - `new()` + `start()` spawns the async task
//! - `run()` is a single `tokio::select!` loop over cancellation, commands,
//!   inbound frames and the reconnect timer
//! - Dropping every [`LiveHandle`] or cancelling the token disposes the link

use std::collections::VecDeque;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::LiveConfig;
use super::error::LiveError;
use super::protocol::OutboundFrame;
use super::schedule::ScheduledTask;
use super::supervisor::{ConnectionSupervisor, SupervisorAction};
use super::transport::{Connection, Transport};
use crate::alerts::{Alert, SosReport};
use crate::fleet::{ConnectionState, Vehicle};

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 16;

/// Something the live link observed.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// A decoded vehicle update.
    VehicleUpdate(Vehicle),
    /// A decoded alert.
    Alert(Alert),
    /// The connection state changed.
    State(ConnectionState),
    /// The advisory message changed (`None` clears it).
    Advisory(Option<String>),
}

#[derive(Debug)]
enum LiveCommand {
    SendSos {
        report: SosReport,
        reply: oneshot::Sender<bool>,
    },
}

/// Handle for interacting with a running live link.
#[derive(Debug, Clone)]
pub struct LiveHandle {
    commands: mpsc::Sender<LiveCommand>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl LiveHandle {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Send an SOS report if the connection is open.
    ///
    /// Returns false when not open, when the send fails, or when the link has
    /// stopped. Nothing is persisted here.
    pub async fn send_sos_report(&self, report: SosReport) -> bool {
        if !self.state().is_open() {
            tracing::debug!(report_id = %report.id, "Live connection not open, SOS not sent");
            return false;
        }

        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(LiveCommand::SendSos { report, reply })
            .await
            .is_err()
        {
            return false;
        }
        response.await.unwrap_or(false)
    }

    /// Stop the link: cancel the reconnect timer and close the connection.
    /// Safe to call more than once.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Check whether [`LiveHandle::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Async driver for one live connection.
pub struct LiveLink<T: Transport> {
    transport: T,
    connect_timeout: std::time::Duration,
    supervisor: ConnectionSupervisor,
    reconnect: ScheduledTask,
    events: mpsc::Sender<LiveEvent>,
    state_tx: watch::Sender<ConnectionState>,
    commands: mpsc::Receiver<LiveCommand>,
    cancel: CancellationToken,
}

impl<T: Transport> LiveLink<T> {
    /// Create a link and its handle. Nothing happens until [`LiveLink::start`].
    pub fn new(
        transport: T,
        config: LiveConfig,
        events: mpsc::Sender<LiveEvent>,
        cancel: CancellationToken,
    ) -> (Self, LiveHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let handle = LiveHandle {
            commands: command_tx,
            state: state_rx,
            cancel: cancel.clone(),
        };
        let link = Self {
            transport,
            connect_timeout: config.connect_timeout,
            supervisor: ConnectionSupervisor::new(config),
            reconnect: ScheduledTask::new(),
            events,
            state_tx,
            commands: command_rx,
            cancel,
        };
        (link, handle)
    }

    /// Start the link as an async task.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        let mut conn: Option<T::Conn> = None;
        let mut pending: VecDeque<SupervisorAction> = self.supervisor.start().into();

        loop {
            while let Some(action) = pending.pop_front() {
                self.execute(action, &mut conn, &mut pending).await;
            }
            if self.supervisor.is_disposed() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    pending.extend(self.supervisor.dispose());
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command, &mut conn).await,
                    None => {
                        tracing::debug!("All live handles dropped");
                        pending.extend(self.supervisor.dispose());
                    }
                },
                frame = recv_frame(&mut conn) => match frame {
                    Some(Ok(text)) => {
                        pending.extend(self.supervisor.on_text(&text, Utc::now()));
                    }
                    Some(Err(e)) => {
                        conn = None;
                        pending.extend(self.supervisor.on_error(&e.to_string()));
                        pending.extend(self.supervisor.on_close());
                    }
                    None => {
                        conn = None;
                        pending.extend(self.supervisor.on_close());
                    }
                },
                _ = self.reconnect.fired() => {
                    pending.extend(self.supervisor.on_reconnect_timer());
                }
            }
        }

        tracing::info!("Live link stopped");
    }

    async fn execute(
        &mut self,
        action: SupervisorAction,
        conn: &mut Option<T::Conn>,
        pending: &mut VecDeque<SupervisorAction>,
    ) {
        match action {
            SupervisorAction::Connect { url } => {
                let timeout = self.connect_timeout;
                let result = tokio::select! {
                    _ = self.cancel.cancelled() => {
                        pending.extend(self.supervisor.dispose());
                        return;
                    }
                    result = tokio::time::timeout(timeout, self.transport.connect(&url)) => result,
                };

                match result {
                    Ok(Ok(connection)) => {
                        *conn = Some(connection);
                        pending.extend(self.supervisor.on_open());
                    }
                    Ok(Err(e)) => {
                        pending.extend(self.supervisor.on_connect_failed(&e.to_string()));
                    }
                    Err(_) => {
                        let e = LiveError::Timeout {
                            url,
                            secs: timeout.as_secs(),
                        };
                        pending.extend(self.supervisor.on_connect_failed(&e.to_string()));
                    }
                }
            }
            SupervisorAction::Send(frame) => {
                let Some(connection) = conn.as_mut() else {
                    return;
                };
                let result = match frame.to_json() {
                    Ok(text) => connection.send(text).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    *conn = None;
                    pending.extend(self.supervisor.on_error(&e.to_string()));
                    pending.extend(self.supervisor.on_close());
                }
            }
            SupervisorAction::ScheduleReconnect(delay) => {
                self.reconnect.schedule(delay);
            }
            SupervisorAction::CancelReconnect => {
                self.reconnect.cancel();
            }
            SupervisorAction::Close => {
                if let Some(mut connection) = conn.take() {
                    if let Err(e) = connection.close().await {
                        tracing::debug!(error = %e, "Error closing live connection");
                    }
                }
            }
            SupervisorAction::Upsert(vehicle) => self.emit(LiveEvent::VehicleUpdate(vehicle)).await,
            SupervisorAction::Alert(alert) => self.emit(LiveEvent::Alert(alert)).await,
            SupervisorAction::StateChanged(state) => {
                self.state_tx.send_replace(state);
                self.emit(LiveEvent::State(state)).await;
            }
            SupervisorAction::Advisory(message) => self.emit(LiveEvent::Advisory(message)).await,
        }
    }

    async fn handle_command(&mut self, command: LiveCommand, conn: &mut Option<T::Conn>) {
        match command {
            LiveCommand::SendSos { report, reply } => {
                let delivered = self.send_sos(report, conn).await;
                let _ = reply.send(delivered);
            }
        }
    }

    async fn send_sos(&mut self, report: SosReport, conn: &mut Option<T::Conn>) -> bool {
        let (true, Some(connection)) = (self.supervisor.can_send(), conn.as_mut()) else {
            return false;
        };

        let report_id = report.id.clone();
        let result = match (OutboundFrame::SosReport { data: report }).to_json() {
            Ok(text) => connection.send(text).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!(report_id = %report_id, "SOS report sent");
                true
            }
            Err(e) => {
                tracing::warn!(report_id = %report_id, error = %e, "Failed to send SOS report");
                false
            }
        }
    }

    async fn emit(&self, event: LiveEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Live event receiver dropped, stopping link");
            self.cancel.cancel();
        }
    }
}

async fn recv_frame<C: Connection>(conn: &mut Option<C>) -> Option<Result<String, LiveError>> {
    match conn {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use crate::geo::GeoPoint;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    // ========================================================================
    // Scripted transport
    // ========================================================================

    /// Server side of one accepted mock connection.
    struct MockPeer {
        pub inbound: mpsc::UnboundedSender<String>,
        pub sent: Arc<Mutex<Vec<String>>>,
    }

    enum Plan {
        Refuse,
        Accept(mpsc::UnboundedReceiver<String>, Arc<Mutex<Vec<String>>>),
    }

    /// Transport that plays back a queue of connection outcomes.
    /// An empty queue refuses.
    #[derive(Clone, Default)]
    struct MockTransport {
        plans: Arc<Mutex<VecDeque<Plan>>>,
        pub connects: Arc<Mutex<u32>>,
    }

    impl MockTransport {
        pub fn refuse(&self) {
            self.plans.lock().push_back(Plan::Refuse);
        }

        pub fn accept(&self) -> MockPeer {
            let (tx, rx) = mpsc::unbounded_channel();
            let sent = Arc::new(Mutex::new(Vec::new()));
            self.plans.lock().push_back(Plan::Accept(rx, sent.clone()));
            MockPeer { inbound: tx, sent }
        }
    }

    struct MockConnection {
        inbound: mpsc::UnboundedReceiver<String>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Transport for MockTransport {
        type Conn = MockConnection;

        async fn connect(&self, url: &str) -> Result<MockConnection, LiveError> {
            *self.connects.lock() += 1;
            let plan = self.plans.lock().pop_front();
            match plan {
                Some(Plan::Accept(inbound, sent)) => Ok(MockConnection { inbound, sent }),
                _ => Err(LiveError::Connect {
                    url: url.to_string(),
                    reason: "refused".to_string(),
                }),
            }
        }
    }

    impl Connection for MockConnection {
        async fn send(&mut self, text: String) -> Result<(), LiveError> {
            self.sent.lock().push(text);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String, LiveError>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn close(&mut self) -> Result<(), LiveError> {
            self.inbound.close();
            Ok(())
        }
    }

    fn start_link(
        transport: MockTransport,
    ) -> (LiveHandle, mpsc::Receiver<LiveEvent>, JoinHandle<()>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let config = LiveConfig::default().with_vehicle("V1234");
        let (link, handle) = LiveLink::new(transport, config, events_tx, CancellationToken::new());
        let task = link.start();
        (handle, events_rx, task)
    }

    async fn wait_for_state(events: &mut mpsc::Receiver<LiveEvent>, wanted: ConnectionState) {
        while let Some(event) = events.recv().await {
            if event == LiveEvent::State(wanted) {
                return;
            }
        }
        panic!("event channel closed before {:?}", wanted);
    }

    async fn wait_sent(peer: &MockPeer, count: usize) {
        for _ in 0..100 {
            if peer.sent.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {} sent frames", count);
    }

    fn report() -> SosReport {
        SosReport {
            id: "sos-1".to_string(),
            vehicle_id: "V1234".to_string(),
            alert_type: AlertKind::Collision,
            location: GeoPoint::new(12.9716, 77.5946),
            timestamp: Utc::now(),
        }
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_open_subscribes_and_forwards_updates() {
        let transport = MockTransport::default();
        let peer = transport.accept();
        let (handle, mut events, _task) = start_link(transport);

        wait_for_state(&mut events, ConnectionState::Open).await;
        assert_eq!(handle.state(), ConnectionState::Open);
        wait_sent(&peer, 2).await;
        assert_eq!(peer.sent.lock().len(), 2);

        peer.inbound
            .send(r#"{"type":"vehicle_update","data":{"vehicle_id":"V1234","location":{"lat":1,"lng":2},"speed":5}}"#.to_string())
            .unwrap();
        match events.recv().await.unwrap() {
            LiveEvent::VehicleUpdate(v) => assert_eq!(v.id, "V1234"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_connection_retries_after_delay() {
        let transport = MockTransport::default();
        transport.refuse();
        let _peer = transport.accept();
        let (_handle, mut events, _task) = start_link(transport.clone());

        wait_for_state(&mut events, ConnectionState::Reconnecting).await;
        let started = tokio::time::Instant::now();
        wait_for_state(&mut events, ConnectionState::Open).await;

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(*transport.connects.lock(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_close_reconnects() {
        let transport = MockTransport::default();
        let peer = transport.accept();
        let second = transport.accept();
        let (_handle, mut events, _task) = start_link(transport.clone());

        wait_for_state(&mut events, ConnectionState::Open).await;
        drop(peer);
        wait_for_state(&mut events, ConnectionState::Reconnecting).await;
        wait_for_state(&mut events, ConnectionState::Open).await;

        wait_sent(&second, 2).await;
        assert_eq!(second.sent.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sos_sent_only_when_open() {
        let transport = MockTransport::default();
        transport.refuse();
        let (handle, mut events, _task) = start_link(transport);

        wait_for_state(&mut events, ConnectionState::Reconnecting).await;
        assert!(!handle.send_sos_report(report()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sos_delivered_when_open() {
        let transport = MockTransport::default();
        let peer = transport.accept();
        let (handle, mut events, _task) = start_link(transport);

        wait_for_state(&mut events, ConnectionState::Open).await;
        assert!(handle.send_sos_report(report()).await);

        let sent = peer.sent.lock();
        assert_eq!(sent.len(), 3);
        let frame: serde_json::Value = serde_json::from_str(&sent[2]).unwrap();
        assert_eq!(frame["type"], "sos_report");
        assert_eq!(frame["data"]["id"], "sos-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_stops_link_and_cancels_reconnect() {
        let transport = MockTransport::default();
        transport.refuse();
        let (handle, mut events, task) = start_link(transport.clone());

        wait_for_state(&mut events, ConnectionState::Reconnecting).await;
        handle.dispose();
        handle.dispose();
        task.await.unwrap();

        // No reconnect happened after dispose
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(*transport.connects.lock(), 1);
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(handle.is_disposed());
    }
}

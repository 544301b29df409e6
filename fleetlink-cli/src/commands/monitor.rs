//! Monitor command - run a monitoring session and print the nearby view.

use std::sync::Arc;
use std::time::Duration;

use fleetlink::fleet::{
    spawn_fleet_logger, FleetBroadcaster, FleetProvider, DEFAULT_LOG_INTERVAL,
};
use fleetlink::live::WebSocketTransport;
use fleetlink::session::MonitoringSession;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::output::{alert_line, nearby_table, status_line};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the monitor command.
pub struct MonitorArgs {
    pub vehicle: Option<String>,
    pub offline: bool,
    pub seed: Option<u64>,
    pub duration: Option<u64>,
    pub debug: bool,
}

/// Run the monitor command.
pub fn run(args: MonitorArgs) -> Result<(), CliError> {
    let mut runner = CliRunner::with_debug(args.debug)?;
    runner.log_startup("monitor");

    let config = runner.config_mut();
    if let Some(vehicle) = args.vehicle {
        config.monitor.focal_vehicle = vehicle;
    }
    if args.seed.is_some() {
        config.simulation.seed = args.seed;
    }
    let offline = args.offline || !config.live.enabled;
    let session_config = config.session_config();
    let store = runner.store();
    let duration = args.duration.map(Duration::from_secs);

    println!("Monitoring {} (Ctrl-C to stop)", session_config.monitor.focal_id);
    if offline {
        println!("Running offline on the simulated fleet");
    } else {
        println!("Connecting to {}", session_config.live.url());
    }

    runner.block_on(async move {
        let session = Arc::new(if offline {
            MonitoringSession::start_simulated(session_config, store)
        } else {
            MonitoringSession::start_with_live(session_config, store, WebSocketTransport)
        });

        let logger_cancel = CancellationToken::new();
        let logger = spawn_fleet_logger(
            Arc::clone(&session),
            logger_cancel.clone(),
            DEFAULT_LOG_INTERVAL,
        );

        watch_session(&session, duration).await;

        logger_cancel.cancel();
        let _ = logger.await;
        session.shutdown().await;
        println!("Session closed");
    })
}

async fn watch_session(session: &MonitoringSession, duration: Option<Duration>) {
    let mut views = session.subscribe_view();
    let mut alerts = session.subscribe_alerts();

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    if let Some(view) = views.borrow_and_update().clone() {
        print!("{}", nearby_table(&view));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            _ = &mut deadline => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if let Some(view) = view {
                    println!();
                    println!("{}", status_line(&session.status()));
                    print!("{}", nearby_table(&view));
                }
            }
            notification = alerts.recv() => match notification {
                Ok(notification) => {
                    let line = alert_line(notification.alert());
                    println!("ALERT {}: {}", notification.name(), line);
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Alert notifications lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

//! SOS command - submit an emergency report.

use std::time::Duration;

use fleetlink::alerts::{AlertKind, Severity, SosOutcome, SosRequest};
use fleetlink::live::WebSocketTransport;
use fleetlink::session::MonitoringSession;

use super::output::alert_line;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the sos command.
pub struct SosArgs {
    pub vehicle: Option<String>,
    pub alert_type: String,
    pub severity: String,
    pub description: Option<String>,
    pub wait: u64,
    pub offline: bool,
}

/// Run the sos command.
pub fn run(args: SosArgs) -> Result<(), CliError> {
    let severity = Severity::parse(&args.severity).ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "unknown severity '{}' (use low, medium or high)",
            args.severity
        ))
    })?;

    let runner = CliRunner::new()?;
    runner.log_startup("sos");

    let config = runner.config();
    let vehicle = args
        .vehicle
        .unwrap_or_else(|| config.monitor.focal_vehicle.clone());
    let mut session_config = config.session_config();
    session_config.monitor.focal_id = vehicle.clone();
    session_config.live = session_config.live.with_vehicle(vehicle.clone());
    let offline = args.offline || !config.live.enabled;
    let store = runner.store();
    let wait = Duration::from_secs(args.wait);

    let mut request = SosRequest::new(vehicle)
        .with_type(AlertKind::from(args.alert_type.as_str()))
        .with_severity(severity);
    if let Some(description) = args.description {
        request = request.with_description(description);
    }

    let outcome = runner.block_on(async move {
        let session = if offline {
            MonitoringSession::start_simulated(session_config, store)
        } else {
            let url = session_config.live.url().to_string();
            let session =
                MonitoringSession::start_with_live(session_config, store, WebSocketTransport);
            println!("Waiting up to {}s for {}", wait.as_secs(), url);
            if !session.wait_until_open(wait).await {
                println!("Server not reachable");
            }
            session
        };

        let outcome = session.submit_sos(request).await;
        session.shutdown().await;
        outcome
    })?;

    match outcome {
        SosOutcome::Delivered(report) => {
            println!("SOS {} delivered to the server", report.id);
        }
        SosOutcome::StoredLocally(alert) => {
            println!("SOS {} stored locally: {}", alert.id, alert_line(&alert));
        }
    }

    Ok(())
}

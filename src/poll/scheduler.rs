use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::api::smappee::SmappeeApi;
use crate::config::service::PollConfig;
use crate::observability::metrics::get_metrics;
use crate::sinks::publish::PublishSink;

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Poll the publishing operations every `poll.interval_seconds` until `shutdown` resolves.
/// The first cycle runs immediately.
pub async fn run<P, F>(api: &SmappeeApi<P>, poll: &PollConfig, shutdown: F) -> Result<()>
where
    P: PublishSink,
    F: Future<Output = ()>,
{
    if poll.service_location_id.is_none() && poll.charging_station_serial.is_none() {
        bail!("nothing to poll: set poll.service_location_id and/or poll.charging_station_serial");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(poll.interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!("polling every {}s", poll.interval_seconds);
    loop {
        select! {
            _ = ticker.tick() => {
                let report = poll_once(api, poll).await;
                info!("poll cycle done: {} succeeded, {} failed", report.succeeded, report.failed);
            }
            _ = &mut shutdown => {
                info!("poll loop stopped");
                break;
            }
        }
    }
    Ok(())
}

/// One sequential pass over the configured targets. Failures are logged, never propagated.
pub async fn poll_once<P: PublishSink>(api: &SmappeeApi<P>, poll: &PollConfig) -> CycleReport {
    let mut report = CycleReport::default();

    if let Some(service_location_id) = poll.service_location_id {
        match api.latest_consumption(service_location_id).await {
            Ok(Some(record)) => {
                info!("latest consumption for {} at {}", service_location_id, record.timestamp);
                report.succeeded += 1;
            }
            Ok(None) => {
                info!("no recent consumption for {}", service_location_id);
                report.succeeded += 1;
            }
            Err(e) => {
                error!("latest consumption for {} failed: {}", service_location_id, e);
                report.failed += 1;
            }
        }
    }

    if let Some(serial) = poll.charging_station_serial.as_deref() {
        match api.current_charging_session(serial).await {
            Ok(sessions) => {
                info!(
                    "charging station {}: {} active session(s)",
                    serial,
                    sessions.as_ref().map(Vec::len).unwrap_or(0)
                );
                report.succeeded += 1;
            }
            Err(e) => {
                error!("charging session for {} failed: {}", serial, e);
                report.failed += 1;
            }
        }
    }

    get_metrics().await.poll_cycles.inc();
    report
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    select! {
        _ = sigint.recv() => info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown..."),
        _ = sigterm.recv() => info!("Received SIGTERM. Initiating graceful shutdown..."),
    }
    Ok(())
}

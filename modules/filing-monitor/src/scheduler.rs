use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::monitor::{CycleOutcome, Monitor};

/// Drive `monitor` until `shutdown` resolves.
///
/// Each cycle runs to completion before the next is scheduled, and the
/// `interval` is measured from the end of the previous cycle. A failed cycle
/// is logged and the loop carries on.
pub async fn run_scheduler<F>(mut monitor: Monitor, interval: Duration, shutdown: F) -> Monitor
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    info!(interval_secs = interval.as_secs(), "Filing monitor started");

    loop {
        tokio::select! {
            result = monitor.run_cycle() => match result {
                Ok(CycleOutcome::Processed { document_url, .. }) => {
                    info!(%document_url, "Monitor cycle stored a new filing");
                }
                Ok(outcome) => info!(?outcome, "Monitor cycle complete"),
                Err(e) => error!(error = %e, "Monitor cycle failed"),
            },
            _ = &mut shutdown => break,
        }

        info!(sleep_secs = interval.as_secs(), "Monitor sleeping until next check");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => break,
        }
    }

    info!("Filing monitor stopped");
    monitor
}

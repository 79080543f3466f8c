//! Fixed-delay polling loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::cycle::CycleAggregator;
use crate::fetch::HttpClient;

/// Runs cycles back to back with a fixed sleep after each one, so the period
/// is the cycle's own duration plus `interval`.
///
/// Each cycle runs on its own task. A cycle that panics is logged and the
/// loop moves on to the next one.
pub struct Scheduler<C> {
    aggregator: Arc<CycleAggregator<C>>,
    interval: Duration,
}

impl<C: HttpClient + 'static> Scheduler<C> {
    pub fn new(aggregator: Arc<CycleAggregator<C>>, interval: Duration) -> Self {
        Self {
            aggregator,
            interval,
        }
    }

    /// Polls until `max_cycles` cycles have run; `0` polls forever.
    ///
    /// No sleep follows the final cycle of a bounded run.
    pub async fn run(&self, max_cycles: usize) {
        if max_cycles == 0 {
            info!(interval_secs = self.interval.as_secs(), "Polling indefinitely");
        } else {
            info!(max_cycles, interval_secs = self.interval.as_secs(), "Polling");
        }

        let mut completed = 0usize;
        loop {
            completed += 1;

            let aggregator = self.aggregator.clone();
            let handle = tokio::spawn(async move { aggregator.run_cycle().await });
            if let Err(e) = handle.await {
                error!(cycle = completed, error = %e, "Cycle aborted, continuing to poll");
            }

            if max_cycles > 0 && completed >= max_cycles {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        info!(cycles = completed, "Polling stopped");
    }
}

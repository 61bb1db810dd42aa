//! Emitter — periodic snapshot loop.
//!
//! Cluster events are aperiodic, but downstream consumers expect a full set
//! of metrics every interval. The emitter snapshots the store on a fixed
//! timer and hands each snapshot to a [`MetricsSink`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use clusterscope_core::{MAX_INTERVAL, Timestamp};
use clusterscope_store::MetricsStore;

use crate::error::SinkResult;
use crate::sink::MetricsSink;

/// Snapshots a [`MetricsStore`] every interval and forwards the result.
pub struct Emitter<S> {
    store: Arc<MetricsStore>,
    sink: S,
    interval: Duration,
}

impl<S: MetricsSink> Emitter<S> {
    /// `interval` is clamped to [`MAX_INTERVAL`].
    pub fn new(store: Arc<MetricsStore>, sink: S, interval: Duration) -> Self {
        Self {
            store,
            sink,
            interval: interval.min(MAX_INTERVAL),
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Emit one snapshot stamped `now`. Returns the number of batches sent.
    pub async fn tick(&mut self, now: Timestamp) -> SinkResult<usize> {
        let batches = self.store.snapshot(now);
        let count = batches.len();
        self.sink.consume(batches).await?;
        debug!(batches = count, "metrics emitted");
        Ok(count)
    }

    /// Run the emission loop until shutdown signal.
    ///
    /// The first snapshot goes out one interval after start. A failed
    /// emission is logged and the loop carries on with the next tick.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "metrics emitter started"
        );

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Timestamp::now()).await {
                        error!(error = %e, "metrics emission failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("metrics emitter shutting down");
                    // Final snapshot before exit.
                    if let Err(e) = self.tick(Timestamp::now()).await {
                        error!(error = %e, "final metrics emission failed");
                    }
                    break;
                }
            }
        }
    }
}

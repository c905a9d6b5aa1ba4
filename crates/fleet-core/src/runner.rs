//! The recurring tick loop.
//!
//! [`run_simulation`] calls a [`TickSource`] once per interval until it is
//! told to stop or hits `max_ticks`. A failed tick is logged and skipped;
//! the next tick runs on schedule. Nothing a tick does can end the loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::tick::{Simulator, TickError, TickSummary};

/// Something that can run one tick.
pub trait TickSource: Send {
    /// Run one tick.
    fn run_tick(&mut self) -> impl Future<Output = Result<TickSummary, TickError>> + Send;
}

impl TickSource for Simulator {
    fn run_tick(&mut self) -> impl Future<Output = Result<TickSummary, TickError>> + Send {
        Self::run_tick(self)
    }
}

/// Why the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Ran the configured number of ticks.
    MaxTicksReached,
    /// A shutdown was requested.
    Shutdown,
}

/// Result of a tick loop run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the loop ended.
    pub end_reason: SimulationEndReason,
    /// Ticks attempted, successful or not.
    pub ticks_run: u64,
    /// Ticks that failed and were skipped.
    pub failed_ticks: u64,
    /// The last successful tick, if any.
    pub final_summary: Option<TickSummary>,
}

/// Run ticks every `interval` until shutdown or `max_ticks` (0 = no limit).
///
/// The first tick runs one full interval after the call. Shutdown is
/// signalled by sending `true` on the watch channel or dropping its sender.
pub async fn run_simulation<S: TickSource>(
    source: &mut S,
    interval: Duration,
    max_ticks: u64,
    mut shutdown: watch::Receiver<bool>,
) -> SimulationResult {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks_run: u64 = 0;
    let mut failed_ticks: u64 = 0;
    let mut last_summary: Option<TickSummary> = None;

    info!(
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        max_ticks,
        "Simulation starting"
    );

    let end_reason = loop {
        if *shutdown.borrow() {
            break SimulationEndReason::Shutdown;
        }
        if max_ticks > 0 && ticks_run >= max_ticks {
            info!(max_ticks, "Tick limit reached");
            break SimulationEndReason::MaxTicksReached;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break SimulationEndReason::Shutdown;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        ticks_run = ticks_run.saturating_add(1);
        match source.run_tick().await {
            Ok(summary) => last_summary = Some(summary),
            Err(e) => {
                failed_ticks = failed_ticks.saturating_add(1);
                warn!(tick = ticks_run, error = %e, "Tick failed, skipping");
            }
        }
    };

    SimulationResult {
        end_reason,
        ticks_run,
        failed_ticks,
        final_summary: last_summary,
    }
}

/// Run the tick loop on a background task.
pub fn spawn_simulation<S: TickSource + 'static>(
    mut source: S,
    interval: Duration,
    max_ticks: u64,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<SimulationResult> {
    tokio::spawn(async move { run_simulation(&mut source, interval, max_ticks, shutdown).await })
}

/// Log how the run ended.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        ticks_run = result.ticks_run,
        failed_ticks = result.failed_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            buses = summary.snapshot.buses().len(),
            notified = summary.notification.is_some(),
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no successful ticks");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use fleet_types::BusId;
    use fleet_world::create_starting_fleet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::config::BroadcastConfig;
    use crate::store::{StateStore, StoreError};
    use crate::tick::{FleetSnapshot, SimulationParams};

    /// Fails every `fail_every`-th tick.
    struct FlakySource {
        calls: u64,
        fail_every: u64,
    }

    impl TickSource for FlakySource {
        async fn run_tick(&mut self) -> Result<TickSummary, TickError> {
            self.calls = self.calls.saturating_add(1);
            if self.fail_every > 0 && self.calls % self.fail_every == 0 {
                return Err(StoreError::BusNotFound(BusId(0)).into());
            }
            Ok(TickSummary {
                tick: self.calls,
                snapshot: FleetSnapshot::new(self.calls, Utc::now(), Vec::new()),
                notification: None,
                delivered: 0,
                dropped: 0,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_max_ticks_and_survives_failures() {
        let mut source = FlakySource {
            calls: 0,
            fail_every: 2,
        };
        let (_tx, rx) = watch::channel(false);

        let result = run_simulation(&mut source, Duration::from_secs(5), 5, rx).await;

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.ticks_run, 5);
        assert_eq!(result.failed_ticks, 2);
        assert_eq!(result.final_summary.map(|s| s.tick), Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_signal_ends_the_loop() {
        let (tx, rx) = watch::channel(false);
        let handle = spawn_simulation(
            FlakySource {
                calls: 0,
                fail_every: 0,
            },
            Duration::from_secs(5),
            0,
            rx,
        );

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(tx.send(true).is_ok());

        let result = handle.await.unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::Shutdown);
        assert_eq!(result.ticks_run, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_counts_as_shutdown() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mut source = FlakySource {
            calls: 0,
            fail_every: 0,
        };
        let result = run_simulation(&mut source, Duration::from_secs(1), 0, rx).await;
        assert_eq!(result.end_reason, SimulationEndReason::Shutdown);
        assert_eq!(result.ticks_run, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drives_the_real_simulator() {
        let store = Arc::new(StateStore::from_seed(create_starting_fleet()).unwrap());
        let hub = Arc::new(Broadcaster::new(&BroadcastConfig::default()));
        let mut sub = hub.subscribe().await;
        let mut sim = Simulator::with_rng(
            Arc::clone(&store),
            Arc::clone(&hub),
            SimulationParams {
                notification_probability: 0.0,
                ..SimulationParams::default()
            },
            StdRng::seed_from_u64(3),
        );
        let (_tx, rx) = watch::channel(false);

        let result = run_simulation(&mut sim, Duration::from_secs(5), 3, rx).await;

        assert_eq!(result.ticks_run, 3);
        assert_eq!(result.failed_ticks, 0);
        assert_eq!(store.batches_applied(), 3);
        for _ in 0..3 {
            assert!(sub.try_recv().is_some());
        }
        assert!(sub.try_recv().is_none());
    }
}

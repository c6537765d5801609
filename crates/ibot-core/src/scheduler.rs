//! Fixed-period job runner for the poller and the daily digest.
//!
//! - One tokio task per job, ticking on `tokio::time::interval`
//! - The first tick fires immediately; missed ticks are delayed, not bursted
//! - Each tick runs in its own task so an error or panic is logged and the
//!   timer keeps going
//! - Jobs stop when the shared `CancellationToken` is cancelled; an in-flight
//!   tick is aborted

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Body of a periodic timer. The job owns its state; nothing else can reach
/// it while the runner holds it.
#[async_trait]
pub trait PeriodicJob: Send + 'static {
    fn name(&self) -> &'static str;

    async fn run_tick(&mut self) -> Result<()>;
}

pub fn spawn_periodic<J: PeriodicJob>(
    job: J,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let name = job.name();
    let job = Arc::new(Mutex::new(job));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(job = name, period_secs = period.as_secs(), "periodic job started");

        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = ticker.tick() => {
                let job = job.clone();
                let mut tick = tokio::spawn(async move { job.lock().await.run_tick().await });
                // A tick stuck behind send throttling must not hold up shutdown.
                let res = tokio::select! {
                    _ = cancel.cancelled() => {
                        tick.abort();
                        break;
                    }
                    res = &mut tick => res,
                };
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(job = name, error = %e, "tick failed"),
                    Err(e) if e.is_panic() => {
                        tracing::error!(job = name, "tick panicked, timer keeps running")
                    }
                    Err(e) => tracing::warn!(job = name, error = %e, "tick aborted"),
                }
              }
            }
        }

        tracing::info!(job = name, "periodic job stopped");
    })
}

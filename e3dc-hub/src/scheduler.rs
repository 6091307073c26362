//! Polling scheduler
//!
//! A started scheduler owns one background thread running a current-thread
//! tokio runtime. The thread ticks at the scan interval and hands each tick to
//! a [`TickHandler`] on the runtime's blocking pool, so register I/O never runs
//! on the timer loop. A tick is awaited before the next one is considered and
//! missed ticks are skipped, so ticks never overlap.

use std::sync::Weak;
use std::thread;
use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{HubError, Result};

/// Work performed on every scheduler tick
pub(crate) trait TickHandler: Send + Sync + 'static {
    fn on_tick(&self);
}

/// Repeating task that is either idle or running one worker
pub(crate) struct PollingScheduler {
    interval: Duration,
    task: Option<PollingTask>,
}

/// A running worker thread
struct PollingTask {
    shutdown_tx: oneshot::Sender<()>,
    started_at: SystemTime,
}

impl PollingScheduler {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub(crate) fn started_at(&self) -> Option<SystemTime> {
        self.task.as_ref().map(|task| task.started_at)
    }

    /// Transition Idle -> Active
    ///
    /// The worker holds only a weak reference to `handler` and exits on its
    /// own once the handler is gone. Starting an active scheduler is a no-op.
    pub(crate) fn start(&mut self, name: &str, handler: Weak<dyn TickHandler>) -> Result<()> {
        if self.task.is_some() {
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let interval = self.interval;
        let thread_name = format!("e3dc-poll-{}", name);

        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!("Failed to create tokio runtime for {}: {}", thread_name, e);
                        return;
                    }
                };

                rt.block_on(polling_loop(interval, handler, shutdown_rx));
                tracing::debug!("Polling worker {} stopped", thread_name);
            })
            .map_err(|e| HubError::Scheduler(format!("failed to spawn polling worker: {}", e)))?;

        tracing::debug!("Polling every {:?} for {}", interval, name);
        self.task = Some(PollingTask {
            shutdown_tx,
            started_at: SystemTime::now(),
        });
        Ok(())
    }

    /// Transition Active -> Idle
    ///
    /// Signals the worker and returns without joining it, so this is safe to
    /// call from inside a tick. A tick already in progress finishes first.
    /// Returns whether the scheduler was active.
    pub(crate) fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                // The worker may already be gone if its handler was dropped
                let _ = task.shutdown_tx.send(());
                true
            }
            None => false,
        }
    }
}

async fn polling_loop(
    period: Duration,
    handler: Weak<dyn TickHandler>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Shutdown wins over a tick that became ready during a long tick
            biased;
            _ = &mut shutdown_rx => break,
            _ = ticks.tick() => {
                let Some(handler) = handler.upgrade() else {
                    break;
                };

                let result = tokio::task::spawn_blocking(move || handler.on_tick()).await;
                if let Err(e) = result {
                    tracing::error!("Polling tick panicked: {}", e);
                }
            }
        }
    }
}

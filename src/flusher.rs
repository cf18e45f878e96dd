use log::{debug, error};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{OutputError, Result};

/// Calls a flush callback every `period` on its own task.
///
/// Ticks never overlap. Once stopped the callback runs one last time, so
/// anything buffered since the previous tick is still flushed, and nothing
/// runs after `stop` returns.
pub struct PeriodicFlusher {
    period: Duration,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicFlusher {
    /// Arm the timer. Must be called from within a tokio runtime.
    pub fn new<F>(period: Duration, flush: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(OutputError::TimerInit(format!(
                "flush period should be positive but was {:?}",
                period
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| OutputError::TimerInit(e.to_string()))?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = runtime.spawn(async move {
            // The first tick is one full period away
            let mut interval_timer = time::interval_at(Instant::now() + period, period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => flush(),
                    _ = &mut stop_rx => {
                        flush();
                        break;
                    }
                }
            }
        });

        debug!("Periodic flusher armed with a period of {:?}", period);

        Ok(Self {
            period,
            stop_tx,
            handle,
        })
    }

    /// Get the flush period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop ticking and wait for the final flush to complete
    pub async fn stop(self) -> Result<()> {
        // The task may already be gone if the callback panicked
        let _ = self.stop_tx.send(());

        self.handle.await.map_err(|e| {
            error!("Periodic flusher task failed: {}", e);
            OutputError::Flusher(e.to_string())
        })
    }
}

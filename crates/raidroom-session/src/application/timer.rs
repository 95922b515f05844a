//! Cancellable countdown timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// A recurring tick task. Dropping the timer cancels it, so replacing the
/// room's timer always stops the previous one first.
#[derive(Debug)]
pub struct CountdownTimer {
    timer_id: u64,
    task: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawns a task that calls `on_tick(timer_id)` every `period`, starting
    /// one period from now, and sends the result to `target`. The task ends
    /// when `target`'s channel is gone.
    pub fn start<T, F>(timer_id: u64, period: Duration, target: mpsc::WeakSender<T>, on_tick: F) -> Self
    where
        T: Send + 'static,
        F: Fn(u64) -> T + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(sender) = target.upgrade() else {
                    break;
                };
                if sender.send(on_tick(timer_id)).await.is_err() {
                    break;
                }
            }
        });
        Self { timer_id, task }
    }

    /// The id carried by this timer's ticks.
    #[must_use]
    pub fn timer_id(&self) -> u64 {
        self.timer_id
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//! FIFO request throttle enforcing a minimum spacing between dispatches.
//!
//! Callers queue on a fair async mutex that guards the last dispatch time.
//! The queue holder sleeps out the remainder of the interval, stamps the
//! dispatch time, releases the queue and only then runs its task. Dispatch
//! *start* is therefore ordered and spaced while tasks themselves may overlap,
//! and a slow or failing task never holds up the ones behind it.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::trace;

use crate::metrics;

/// Snapshot of throttle state.
#[derive(Debug, Clone)]
pub struct ThrottleStatus {
    pub interval_ms: u64,
    pub dispatched: u64,
    /// Time until the next dispatch slot opens, if one is not already open.
    pub next_slot_in_ms: Option<u64>,
}

/// Serializes task dispatch so no two tasks start closer than `interval`.
pub struct RequestThrottle {
    interval: Duration,
    /// Fair (FIFO) lock; its wait queue is the pending-task queue.
    last_dispatch: Mutex<Option<Instant>>,
    dispatched: AtomicU64,
}

impl RequestThrottle {
    /// Create a throttle with an explicit minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: Mutex::new(None),
            dispatched: AtomicU64::new(0),
        }
    }

    /// Create a throttle from a requests-per-second ceiling.
    ///
    /// 4 requests per second yields 250ms spacing. A rate of 0 is treated as 1.
    pub fn per_second(requests_per_second: u32) -> Self {
        Self::new(Duration::from_secs(1) / requests_per_second.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `task` once its dispatch slot comes up and return its outcome.
    ///
    /// The outcome, success or failure, goes to this caller only. Dropping the
    /// returned future before dispatch gives the slot to the next caller.
    pub async fn execute<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire_slot().await;
        task().await
    }

    /// Wait for the next dispatch slot and claim it.
    async fn acquire_slot(&self) {
        let queued_at = Instant::now();
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        drop(last);

        let seq = self.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
        let waited = now.duration_since(queued_at);
        metrics::THROTTLE_WAIT.observe(waited.as_secs_f64());
        metrics::THROTTLE_DISPATCHED.inc();
        trace!(seq, waited_ms = waited.as_millis() as u64, "Dispatch slot acquired");
    }

    /// Current throttle status.
    ///
    /// Returns `None` for `next_slot_in_ms` while the queue is busy as well,
    /// since the exact opening is only known to the queue holder.
    pub fn status(&self) -> ThrottleStatus {
        let next_slot_in_ms = self.last_dispatch.try_lock().ok().and_then(|last| {
            let ready_at = (*last)? + self.interval;
            let now = Instant::now();
            (ready_at > now).then(|| (ready_at - now).as_millis() as u64)
        });

        ThrottleStatus {
            interval_ms: self.interval.as_millis() as u64,
            dispatched: self.dispatched.load(Ordering::Relaxed),
            next_slot_in_ms,
        }
    }
}

impl std::fmt::Debug for RequestThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestThrottle")
            .field("interval", &self.interval)
            .field("dispatched", &self.dispatched.load(Ordering::Relaxed))
            .finish()
    }
}

//! Global request pacing.
//!
//! A single [`RatePacer`] is shared (via `Arc`) by every worker in the
//! process. It serializes request starts: each granted slot reserves the
//! next one `interval` later, so the observed spacing between any two
//! grants is at least `interval` regardless of how many workers compete.

use crate::backfill::config::RATE_LIMIT_INTERVAL_MS;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Process-wide minimum-interval gate with adaptive penalty state.
#[derive(Debug)]
pub struct RatePacer {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RatePacer {
    /// Create a pacer with the given minimum interval between grants.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Create a pacer with the default production interval.
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_millis(RATE_LIMIT_INTERVAL_MS))
    }

    /// The configured minimum interval between grants.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until it is safe to issue one request, reserving the next slot.
    ///
    /// The lock is held only for the compare-and-set; when the slot is in
    /// the future the caller sleeps outside the lock and retries, so other
    /// workers can compute their (later) slots while this one waits.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut next_slot = self.next_slot.lock().await;
                let now = Instant::now();
                if now >= *next_slot {
                    *next_slot = now + self.interval;
                    return;
                }
                *next_slot - now
            };
            sleep(wait).await;
        }
    }

    /// Push the shared slot forward after an explicit server rejection.
    ///
    /// Every subsequent `acquire` waits at least `penalty` from now; the
    /// slowdown applies to all workers, not just the one that was rejected.
    /// Never moves the slot backwards.
    pub async fn penalize(&self, penalty: Duration) {
        let mut next_slot = self.next_slot.lock().await;
        let candidate = Instant::now() + penalty;
        if candidate > *next_slot {
            *next_slot = candidate;
        }
    }
}

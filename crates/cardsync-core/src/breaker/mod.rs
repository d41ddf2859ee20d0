//! Per-direction reentrancy guard with timed auto-release
//!
//! A breaker is engaged immediately before a propagation write and cleared
//! after a fixed cooldown, whether or not the receiving side reacted. While
//! one direction's breaker is engaged the bridge suppresses propagation in
//! the opposite direction.
//!
//! States:
//! - Clear: propagation in this direction may start
//! - Engaged: a write in this direction is settling
//!
//! Engagement is a plain flag, not a counter: several scheduled releases
//! each clear it once, and the earliest one wins.

mod state;

#[cfg(test)]
mod tests;

pub use state::BreakerSummary;

use cardsync_types::Direction;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Guard for one propagation direction
#[derive(Debug)]
pub struct CircuitBreaker {
    direction: Direction,
    engaged: AtomicBool,
    total_trips: AtomicU64,
    total_releases: AtomicU64,
    pending_releases: AtomicUsize,
}

impl CircuitBreaker {
    pub fn new(direction: Direction) -> Arc<Self> {
        Arc::new(Self {
            direction,
            engaged: AtomicBool::new(false),
            total_trips: AtomicU64::new(0),
            total_releases: AtomicU64::new(0),
            pending_releases: AtomicUsize::new(0),
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Engage the breaker.
    ///
    /// Returns `false` without side effects if it is already engaged.
    pub fn try_enter(&self) -> bool {
        let entered =
            self.engaged.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok();
        if entered {
            self.total_trips.fetch_add(1, Ordering::Relaxed);
            trace!(direction = %self.direction, "Breaker engaged");
        }
        entered
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    /// Clear the flag. Returns whether it was engaged.
    pub fn release(&self) -> bool {
        let was_engaged = self.engaged.swap(false, Ordering::AcqRel);
        if was_engaged {
            self.total_releases.fetch_add(1, Ordering::Relaxed);
            trace!(direction = %self.direction, "Breaker released");
        }
        was_engaged
    }

    /// Clear immediately, used on teardown.
    pub fn reset(&self) {
        if self.release() {
            debug!(direction = %self.direction, "Breaker reset while engaged");
        }
    }

    /// Clear the flag after `after`, then run `then`.
    ///
    /// The task holds only a weak reference to the breaker. It is cancelled
    /// when `shutdown` flips (or its sender is dropped), and once the breaker
    /// itself is gone the timer fires as a no-op.
    pub fn schedule_release<F>(
        self: &Arc<Self>,
        after: Duration,
        mut shutdown: watch::Receiver<bool>,
        then: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let breaker: Weak<Self> = Arc::downgrade(self);
        self.pending_releases.fetch_add(1, Ordering::AcqRel);

        tokio::spawn(async move {
            let fired = if *shutdown.borrow_and_update() {
                false
            } else {
                tokio::select! {
                    () = tokio::time::sleep(after) => true,
                    _ = shutdown.changed() => false,
                }
            };

            let Some(breaker) = breaker.upgrade() else {
                return;
            };
            breaker.pending_releases.fetch_sub(1, Ordering::AcqRel);

            if fired {
                breaker.release();
                drop(breaker);
                then();
            } else {
                debug!(direction = %breaker.direction, "Scheduled release cancelled");
            }
        })
    }

    pub fn summary(&self) -> BreakerSummary {
        BreakerSummary {
            direction: self.direction,
            engaged: self.is_engaged(),
            total_trips: self.total_trips.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            pending_releases: self.pending_releases.load(Ordering::Acquire),
        }
    }
}

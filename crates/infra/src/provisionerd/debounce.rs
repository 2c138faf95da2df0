//! Acquire debounce.
//!
//! After an acquire finds nothing, further acquires return "no job" without
//! touching the store until `interval` has passed. Purely advisory: the
//! store's atomic claim is what keeps two daemons off the same job.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct AcquireDebounce {
    interval: Duration,
    last_miss: Mutex<Option<Instant>>,
}

impl AcquireDebounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_miss: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether an acquire right now should skip the store.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Instant::now())
    }

    fn is_active_at(&self, now: Instant) -> bool {
        if self.interval.is_zero() {
            return false;
        }
        match self.last_miss.lock() {
            Ok(last) => last.is_some_and(|at| now.saturating_duration_since(at) < self.interval),
            // Debouncing is optional; a poisoned lock just stops it.
            Err(_) => false,
        }
    }

    pub fn record_miss(&self) {
        self.set(Some(Instant::now()));
    }

    pub fn clear(&self) {
        self.set(None);
    }

    fn set(&self, value: Option<Instant>) {
        if let Ok(mut last) = self.last_miss.lock() {
            *last = value;
        }
    }
}

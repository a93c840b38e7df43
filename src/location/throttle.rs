//! Outbound call spacing.
//!
//! One `Throttle` per external service. Callers queue on a single mutex, so
//! at most one call is in flight and call starts are at least
//! `min_interval` apart.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Run `call` once the slot is free and the interval has elapsed.
    ///
    /// `call` receives the time left until `deadline`. Returns `None` without
    /// calling when the slot cannot be had before the deadline.
    pub fn run<T>(&self, deadline: Instant, call: impl FnOnce(Duration) -> T) -> Option<T> {
        let mut last = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let ready_at = match *last {
            Some(t) => (t + self.min_interval).max(now),
            None => now,
        };
        if ready_at >= deadline {
            return None;
        }
        thread::sleep(ready_at - now);

        let started = Instant::now();
        *last = Some(started);
        Some(call(deadline.saturating_duration_since(started)))
    }
}

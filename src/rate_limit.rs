//! Inbound per-client rate limiting (sliding window).

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// The client has used up its window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("too many requests; retry in {}s", whole_secs(.retry_after))]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

impl RateLimitExceeded {
    /// Whole seconds to wait, rounded up, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        whole_secs(&self.retry_after)
    }
}

fn whole_secs(d: &Duration) -> u64 {
    (d.as_secs_f64().ceil() as u64).max(1)
}

pub struct RateLimiter {
    config: RateLimitConfig,
    hits: Mutex<ClientWindows>,
}

struct ClientWindows {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl ClientWindows {
    /// Drop clients whose newest request has left the window.
    fn sweep(&mut self, now: Instant, window: Duration) {
        self.clients
            .retain(|_, hits| hits.back().is_some_and(|t| now.duration_since(*t) < window));
        self.last_sweep = now;
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: Mutex::new(ClientWindows {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Record a request from `client`, or reject it if the window is full.
    /// Rejected requests are not recorded.
    pub fn check(&self, client: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        if now.duration_since(hits.last_sweep) >= self.config.window {
            hits.sweep(now, self.config.window);
        }
        let window = hits.clients.entry(client.to_string()).or_default();

        while window
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.window)
        {
            window.pop_front();
        }

        if window.len() >= self.config.max_requests {
            let retry_after = window
                .front()
                .map(|t| self.config.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(self.config.window);
            return Err(RateLimitExceeded { retry_after });
        }

        window.push_back(now);
        Ok(())
    }

    /// Number of clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clients
            .len()
    }
}

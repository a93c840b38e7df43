//! Geocoder — cached, throttled, budgeted text → coordinate resolution.
//!
//! Flow:  cache → throttled provider call (retried on transient failure,
//! linear backoff) → cache fill → coordinate.  Every resolve finishes within
//! `budget`, failing with `GeocodeError::Timeout` once it is spent.

use super::cache::GeocodeCache;
use super::providers::GeocodeProvider;
use super::throttle::Throttle;
use super::types::{normalize, Coordinate, GeocodeError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Tuning for outbound geocoding.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Overall time allowed for one `resolve`, waiting included.
    pub budget: Duration,
    /// Minimum spacing between outbound calls (Nominatim asks for 1/s).
    pub min_interval: Duration,
    /// Attempts per resolve, first one included.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n × retry_backoff` before retrying.
    pub retry_backoff: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(1500),
            min_interval: Duration::from_secs(1),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

pub struct Geocoder {
    provider: Arc<dyn GeocodeProvider>,
    cache: GeocodeCache,
    throttle: Throttle,
    config: GeocoderConfig,
}

impl Geocoder {
    pub fn new(provider: Arc<dyn GeocodeProvider>, config: GeocoderConfig) -> Self {
        Self {
            provider,
            cache: GeocodeCache::new(),
            throttle: Throttle::new(config.min_interval),
            config,
        }
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Resolve place text to a coordinate.
    pub fn resolve(&self, text: &str) -> Result<Coordinate, GeocodeError> {
        let key = normalize(text);
        if key.is_empty() {
            return Err(GeocodeError::NoResults(text.to_string()));
        }

        if let Some(coord) = self.cache.get(&key) {
            log::debug!("geocode cache hit for '{}'", key);
            return Ok(coord);
        }

        let deadline = Instant::now() + self.config.budget;
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let Some(result) = self
                .throttle
                .run(deadline, |remaining| self.provider.geocode(text.trim(), remaining))
            else {
                log::warn!("geocode '{}': no outbound slot before the deadline", key);
                return Err(GeocodeError::Timeout);
            };

            match result {
                Ok(coord) => {
                    self.cache.put(&key, coord);
                    return Ok(coord);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let backoff = self.config.retry_backoff * attempt;
                    if Instant::now() + backoff >= deadline {
                        log::warn!("geocode '{}' gave up after {} attempt(s): {}", key, attempt, e);
                        return Err(GeocodeError::Timeout);
                    }
                    log::debug!("geocode '{}' attempt {} failed: {}; retrying", key, attempt, e);
                    thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => {
                    log::warn!("geocode '{}' failed: {}", key, e);
                    return Err(e);
                }
            }
        }
    }
}

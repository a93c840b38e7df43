//! In-process geocode cache.
//!
//! Lives as long as the owning `Geocoder`. Keys are normalized text, so
//! "Noida", " noida " and "NOIDA" share an entry. Unbounded: the query
//! universe is small.

use super::types::{normalize, Coordinate};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct GeocodeCache {
    entries: Mutex<HashMap<String, Coordinate>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up previously resolved text.
    pub fn get(&self, text: &str) -> Option<Coordinate> {
        let key = normalize(text);
        self.lock().get(&key).copied()
    }

    /// Remember a successful lookup.
    pub fn put(&self, text: &str, coord: Coordinate) {
        let key = normalize(text);
        if key.is_empty() {
            return;
        }
        self.lock().insert(key, coord);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Inserts are single calls, so a poisoned map is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Coordinate>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cache_put_get() {
        let cache = GeocodeCache::new();
        cache.put("Noida", Coordinate::new(28.5355, 77.3910));

        let hit = cache.get("noida").unwrap();
        assert!((hit.latitude - 28.5355).abs() < 1e-9);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_case_and_whitespace_insensitive() {
        let cache = GeocodeCache::new();
        cache.put("New Delhi", Coordinate::new(28.6139, 77.2090));

        assert!(cache.get("NEW DELHI").is_some());
        assert!(cache.get("  new   delhi ").is_some());
    }

    #[test]
    fn test_cache_miss() {
        let cache = GeocodeCache::new();
        assert!(cache.get("nonexistent").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_blank_key_ignored() {
        let cache = GeocodeCache::new();
        cache.put("   ", Coordinate::new(0.0, 0.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(GeocodeCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.put(&format!("place {}", i), Coordinate::new(i as f64, 0.0)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("PLACE 3").unwrap().latitude, 3.0);
    }
}

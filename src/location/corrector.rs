//! Spell correction for place-name queries.
//!
//! Flow:  catalog vocabulary (similarity ≥ threshold) → suggestion service →
//! raw text.  The result is tagged with the path that produced it.

use super::providers::SuggestionProvider;
use super::throttle::Throttle;
use super::types::{normalize, Correction, MatchSource};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct CorrectorConfig {
    /// Minimum similarity (0.0–1.0) for a vocabulary entry to be accepted.
    pub similarity_threshold: f64,
    /// Timeout for one suggestion-service call, throttle wait included.
    pub suggest_timeout: Duration,
    /// Minimum spacing between suggestion-service calls.
    pub min_interval: Duration,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            suggest_timeout: Duration::from_millis(500),
            min_interval: Duration::from_millis(200),
        }
    }
}

struct Entry {
    name: String,
    key: String,
}

pub struct SpellCorrector {
    vocabulary: Vec<Entry>,
    suggester: Arc<dyn SuggestionProvider>,
    throttle: Throttle,
    config: CorrectorConfig,
}

impl SpellCorrector {
    pub fn new(vocabulary: Vec<String>, suggester: Arc<dyn SuggestionProvider>, config: CorrectorConfig) -> Self {
        let vocabulary = vocabulary
            .into_iter()
            .map(|name| Entry {
                key: normalize(&name),
                name,
            })
            .filter(|e| !e.key.is_empty())
            .collect();
        Self {
            vocabulary,
            suggester,
            throttle: Throttle::new(config.min_interval),
            config,
        }
    }

    /// Best-guess place name for `raw`. Never fails: the last resort is `raw` itself.
    pub fn correct(&self, raw: &str) -> Correction {
        let query = normalize(raw);

        if let Some((entry, score)) = self.best_match(&query) {
            if score >= self.config.similarity_threshold {
                let source = if entry.key == query {
                    MatchSource::Exact
                } else {
                    MatchSource::Corrected
                };
                log::debug!("corrected '{}' -> '{}' ({}, score {:.2})", raw, entry.name, source, score);
                return Correction {
                    text: entry.name.clone(),
                    source,
                };
            }
        }

        let text = match self.suggest(raw.trim()) {
            Some(s) => {
                log::debug!("suggestion service: '{}' -> '{}'", raw, s);
                s
            }
            None => raw.trim().to_string(),
        };
        Correction {
            text,
            source: MatchSource::ExternalSuggestion,
        }
    }

    /// Highest-scoring vocabulary entry; ties go to the lexically smaller name.
    fn best_match(&self, query: &str) -> Option<(&Entry, f64)> {
        let mut best: Option<(&Entry, f64)> = None;
        for entry in &self.vocabulary {
            let score = similarity(query, &entry.key);
            best = match best {
                Some((b, s)) if s > score || (s == score && b.name <= entry.name) => Some((b, s)),
                _ => Some((entry, score)),
            };
        }
        best
    }

    fn suggest(&self, text: &str) -> Option<String> {
        let deadline = Instant::now() + self.config.suggest_timeout;
        match self.throttle.run(deadline, |remaining| self.suggester.suggest(text, remaining)) {
            Some(Ok(suggestions)) => suggestions.into_iter().map(|s| s.trim().to_string()).find(|s| !s.is_empty()),
            Some(Err(e)) => {
                log::warn!("suggestion service failed for '{}': {}", text, e);
                None
            }
            None => {
                log::warn!("suggestion service busy; skipping '{}'", text);
                None
            }
        }
    }
}

/// Normalized similarity in 0.0–1.0: `1 − distance / longer length`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

/// Optimal string alignment distance: Levenshtein plus adjacent transpositions.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    // rows i-2, i-1, i
    let mut before = vec![0; n + 1];
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                curr[j] = curr[j].min(before[j - 2] + 1);
            }
        }
        std::mem::swap(&mut before, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

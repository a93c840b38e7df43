//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A point on the Earth's surface, decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Which path of the corrector produced the text that was geocoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchSource {
    /// Query already names a catalog place.
    Exact,
    /// Query was close enough to a catalog place to be corrected to it.
    Corrected,
    /// Suggestion service answer, or the raw query when it had none.
    ExternalSuggestion,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "EXACT"),
            Self::Corrected => write!(f, "CORRECTED"),
            Self::ExternalSuggestion => write!(f, "EXTERNAL_SUGGESTION"),
        }
    }
}

/// Output of the spell corrector.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub text: String,
    pub source: MatchSource,
}

/// A corrected query together with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub corrected_text: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: MatchSource,
}

impl ResolvedLocation {
    pub fn new(correction: Correction, coord: Coordinate) -> Self {
        Self {
            corrected_text: correction.text,
            latitude: coord.latitude,
            longitude: coord.longitude,
            source: correction.source,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Geocoding failures. Each request fails on its own; none is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("geocoding request timed out")]
    Timeout,
    #[error("no geocoding results for '{0}'")]
    NoResults(String),
    #[error("geocoding service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("malformed geocoding response: {0}")]
    MalformedResponse(String),
}

impl GeocodeError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ServiceUnavailable(_))
    }
}

/// Suggestion service failures. The corrector swallows these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestError {
    #[error("suggestion service unavailable: {0}")]
    Unavailable(String),
    #[error("malformed suggestion response: {0}")]
    Malformed(String),
}

/// Lower-case, trim, and collapse internal whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

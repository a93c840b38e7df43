//! External lookup providers: Nominatim geocoding and Photon autocomplete.
//!
//! Providers do a single blocking HTTP call each. Throttling, retries and
//! caching live in the callers.

use super::types::{Coordinate, GeocodeError, SuggestError};
use serde::Deserialize;
use std::io;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "PropertyLocator/1.0 (property-locator)";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const PHOTON_URL: &str = "https://photon.komoot.io/api/";

/// Text → coordinate lookup.
pub trait GeocodeProvider: Send + Sync {
    fn geocode(&self, text: &str, timeout: Duration) -> Result<Coordinate, GeocodeError>;
}

/// Text → best-guess place names, best first.
pub trait SuggestionProvider: Send + Sync {
    fn suggest(&self, text: &str, timeout: Duration) -> Result<Vec<String>, SuggestError>;
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// OpenStreetMap Nominatim search.
pub struct NominatimProvider {
    agent: ureq::Agent,
    base_url: String,
}

impl NominatimProvider {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(user_agent).build(),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for NominatimProvider {
    fn default() -> Self {
        Self::new(NOMINATIM_URL, DEFAULT_USER_AGENT)
    }
}

impl GeocodeProvider for NominatimProvider {
    fn geocode(&self, text: &str, timeout: Duration) -> Result<Coordinate, GeocodeError> {
        let response = self
            .agent
            .get(&self.base_url)
            .query("q", text)
            .query("format", "json")
            .query("limit", "1")
            .timeout(timeout)
            .call()
            .map_err(geocode_error)?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(read_error)?;

        first_coordinate(text, &results)
    }
}

fn first_coordinate(query: &str, results: &[NominatimResult]) -> Result<Coordinate, GeocodeError> {
    let top = results
        .first()
        .ok_or_else(|| GeocodeError::NoResults(query.to_string()))?;

    let lat: f64 = top
        .lat
        .parse()
        .map_err(|_| GeocodeError::MalformedResponse(format!("bad latitude '{}'", top.lat)))?;
    let lon: f64 = top
        .lon
        .parse()
        .map_err(|_| GeocodeError::MalformedResponse(format!("bad longitude '{}'", top.lon)))?;

    let coord = Coordinate::new(lat, lon);
    if !coord.is_valid() {
        return Err(GeocodeError::MalformedResponse(format!(
            "coordinates out of range ({}, {})",
            lat, lon
        )));
    }

    log::debug!(
        "nominatim: '{}' -> {} ({:.4}, {:.4})",
        query,
        top.display_name.as_deref().unwrap_or("?"),
        lat,
        lon
    );
    Ok(coord)
}

// ─── Photon autocomplete ────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Deserialize, Debug)]
struct PhotonFeature {
    properties: PhotonProperties,
}

#[derive(Deserialize, Debug)]
struct PhotonProperties {
    #[serde(default)]
    name: Option<String>,
}

/// Komoot Photon search-as-you-type.
pub struct PhotonProvider {
    agent: ureq::Agent,
    base_url: String,
}

impl PhotonProvider {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(user_agent).build(),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for PhotonProvider {
    fn default() -> Self {
        Self::new(PHOTON_URL, DEFAULT_USER_AGENT)
    }
}

impl SuggestionProvider for PhotonProvider {
    fn suggest(&self, text: &str, timeout: Duration) -> Result<Vec<String>, SuggestError> {
        let response = self
            .agent
            .get(&self.base_url)
            .query("q", text)
            .query("limit", "1")
            .timeout(timeout)
            .call()
            .map_err(|e| SuggestError::Unavailable(e.to_string()))?;

        let body: PhotonResponse = response
            .into_json()
            .map_err(|e| SuggestError::Malformed(e.to_string()))?;

        Ok(suggestion_names(body))
    }
}

fn suggestion_names(body: PhotonResponse) -> Vec<String> {
    body.features
        .into_iter()
        .filter_map(|f| f.properties.name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

// ─── Error mapping ──────────────────────────────────────────────

fn geocode_error(err: ureq::Error) -> GeocodeError {
    match err {
        ureq::Error::Status(code, _) => GeocodeError::ServiceUnavailable(format!("HTTP {}", code)),
        ureq::Error::Transport(t) => {
            if is_timeout(&t) {
                GeocodeError::Timeout
            } else {
                GeocodeError::ServiceUnavailable(t.to_string())
            }
        }
    }
}

fn is_timeout(t: &ureq::Transport) -> bool {
    std::error::Error::source(t)
        .and_then(|s| s.downcast_ref::<io::Error>())
        .is_some_and(is_timeout_io)
}

fn is_timeout_io(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

/// Body read failures: a stalled read is a timeout, anything else a bad payload.
fn read_error(e: io::Error) -> GeocodeError {
    if is_timeout_io(&e) {
        GeocodeError::Timeout
    } else {
        GeocodeError::MalformedResponse(e.to_string())
    }
}

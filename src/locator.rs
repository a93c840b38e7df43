//! LocatorService — the public entry point of the pipeline.
//!
//! Flow:  rate limit → validate → correct → geocode → rank → payload.
//! Every failure past the rate limit becomes a payload with an empty
//! property list and a user-facing message.

use crate::catalog::PropertyCatalog;
use crate::location::providers::{DEFAULT_USER_AGENT, NOMINATIM_URL, PHOTON_URL};
use crate::location::{
    CorrectorConfig, GeocodeProvider, Geocoder, GeocoderConfig, NominatimProvider, PhotonProvider,
    ResolvedLocation, SpellCorrector, SuggestionProvider,
};
use crate::rate_limit::{RateLimitConfig, RateLimitExceeded, RateLimiter};
use crate::ranker::{DistanceRanker, MatchResult, DEFAULT_RADIUS_KM};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub const EMPTY_QUERY_MESSAGE: &str = "Please provide a location to search for.";
pub const EMPTY_CATALOG_MESSAGE: &str = "No properties are available at the moment.";

/// Everything tunable about the pipeline.
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub radius_km: f64,
    pub corrector: CorrectorConfig,
    pub geocoder: GeocoderConfig,
    pub rate_limit: RateLimitConfig,
    pub user_agent: String,
    pub geocode_url: String,
    pub suggest_url: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            corrector: CorrectorConfig::default(),
            geocoder: GeocoderConfig::default(),
            rate_limit: RateLimitConfig::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            geocode_url: NOMINATIM_URL.to_string(),
            suggest_url: PHOTON_URL.to_string(),
        }
    }
}

/// One ranked property as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub property: String,
    pub distance_km: f64,
}

impl From<&MatchResult<'_>> for PropertyMatch {
    fn from(m: &MatchResult<'_>) -> Self {
        Self {
            property: m.property.name.clone(),
            distance_km: (m.distance_km * 100.0).round() / 100.0,
        }
    }
}

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub query: String,
    pub properties: Vec<PropertyMatch>,
    pub message: Option<String>,
}

impl ResponsePayload {
    fn empty(query: &str, message: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            properties: Vec::new(),
            message: Some(message.into()),
        }
    }
}

pub struct LocatorService {
    catalog: Arc<PropertyCatalog>,
    corrector: SpellCorrector,
    geocoder: Geocoder,
    ranker: DistanceRanker,
    limiter: RateLimiter,
    radius_km: f64,
}

impl LocatorService {
    /// Service backed by Nominatim and Photon.
    pub fn new(catalog: PropertyCatalog, config: LocatorConfig) -> Self {
        let geocode = Arc::new(NominatimProvider::new(&config.geocode_url, &config.user_agent));
        let suggest = Arc::new(PhotonProvider::new(&config.suggest_url, &config.user_agent));
        Self::with_providers(catalog, config, geocode, suggest)
    }

    /// Service with caller-supplied providers.
    pub fn with_providers(
        catalog: PropertyCatalog,
        config: LocatorConfig,
        geocode: Arc<dyn GeocodeProvider>,
        suggest: Arc<dyn SuggestionProvider>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            corrector: SpellCorrector::new(catalog.vocabulary(), suggest, config.corrector),
            geocoder: Geocoder::new(geocode, config.geocoder),
            ranker: DistanceRanker::new(Arc::clone(&catalog)),
            limiter: RateLimiter::new(config.rate_limit),
            radius_km: config.radius_km,
            catalog,
        }
    }

    pub fn catalog(&self) -> &PropertyCatalog {
        &self.catalog
    }

    /// Rate-limited entry point: rejects before doing any work.
    pub fn find_properties_for(&self, client: &str, query: &str) -> Result<ResponsePayload, RateLimitExceeded> {
        if let Err(e) = self.limiter.check(client) {
            log::warn!(
                "rate limit: rejected request from {} ({} client(s) tracked)",
                client,
                self.limiter.tracked_clients()
            );
            return Err(e);
        }
        Ok(self.find_properties(query))
    }

    /// Properties near the place named by `query`, nearest first.
    pub fn find_properties(&self, query: &str) -> ResponsePayload {
        let start = Instant::now();
        let trimmed = query.trim();

        if trimmed.is_empty() {
            log::info!("find {:?} -> empty query: 0 match(es)", query);
            return ResponsePayload::empty(query, EMPTY_QUERY_MESSAGE);
        }
        if self.catalog.is_empty() {
            log::warn!("find '{}' -> empty catalog: 0 match(es)", trimmed);
            return ResponsePayload::empty(query, EMPTY_CATALOG_MESSAGE);
        }

        let correction = self.corrector.correct(trimmed);
        let coord = match self.geocoder.resolve(&correction.text) {
            Ok(c) => c,
            Err(e) => {
                log::info!(
                    "find '{}' -> '{}' ({}) unresolved: {} ({:.1}ms)",
                    trimmed,
                    correction.text,
                    correction.source,
                    e,
                    start.elapsed().as_secs_f64() * 1000.0,
                );
                let message = format!("Could not resolve location '{}'.", correction.text);
                return ResponsePayload::empty(query, message);
            }
        };
        let resolved = ResolvedLocation::new(correction, coord);

        let matches = self.ranker.rank(resolved.coordinate(), self.radius_km);
        log::info!(
            "find '{}' -> '{}' ({}) at ({:.4}, {:.4}): {} match(es) ({:.1}ms)",
            trimmed,
            resolved.corrected_text,
            resolved.source,
            resolved.latitude,
            resolved.longitude,
            matches.len(),
            start.elapsed().as_secs_f64() * 1000.0,
        );

        if matches.is_empty() {
            let message = format!("No properties found within {} km radius.", self.radius_km);
            return ResponsePayload::empty(query, message);
        }

        ResponsePayload {
            query: query.to_string(),
            properties: matches.iter().map(PropertyMatch::from).collect(),
            message: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::Property;
    use crate::location::corrector::tests::FakeSuggester;
    use crate::location::geocoder::tests::{fast_config, FakeGeocoder};
    use crate::location::GeocodeError;
    use approx::assert_abs_diff_eq;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    pub(crate) const NOIDA: (&str, f64, f64) = ("noida", 28.5355, 77.3910);
    pub(crate) const MUMBAI: (&str, f64, f64) = ("mumbai", 19.0760, 72.8777);

    pub(crate) fn test_config() -> LocatorConfig {
        LocatorConfig {
            corrector: CorrectorConfig {
                min_interval: Duration::ZERO,
                ..CorrectorConfig::default()
            },
            geocoder: fast_config(),
            ..LocatorConfig::default()
        }
    }

    pub(crate) fn service_with(
        catalog: PropertyCatalog,
        config: LocatorConfig,
        geocode: FakeGeocoder,
        suggest: FakeSuggester,
    ) -> (LocatorService, Arc<FakeGeocoder>, Arc<FakeSuggester>) {
        let geocode = Arc::new(geocode);
        let suggest = Arc::new(suggest);
        let g: Arc<dyn GeocodeProvider> = geocode.clone();
        let s: Arc<dyn SuggestionProvider> = suggest.clone();
        (LocatorService::with_providers(catalog, config, g, s), geocode, suggest)
    }

    pub(crate) fn service() -> (LocatorService, Arc<FakeGeocoder>, Arc<FakeSuggester>) {
        service_with(
            PropertyCatalog::builtin(),
            test_config(),
            FakeGeocoder::with_places(&[NOIDA, MUMBAI]),
            FakeSuggester::answering(&["Mumbai"]),
        )
    }

    #[test]
    fn test_misspelled_noida() {
        let (svc, geocode, suggest) = service();

        let payload = svc.find_properties("nioda");
        assert_eq!(payload.query, "nioda");
        assert_eq!(payload.message, None);
        assert_eq!(payload.properties.len(), 1);
        assert_eq!(payload.properties[0].property, "Moustache Delhi");
        assert_abs_diff_eq!(payload.properties[0].distance_km, 6.27, epsilon = 0.5);
        assert_eq!(geocode.calls(), 1);
        assert_eq!(suggest.calls(), 0);
    }

    #[test]
    fn test_payload_json_shape() {
        let (svc, _, _) = service();
        let json = serde_json::to_value(svc.find_properties("nioda")).unwrap();
        assert_eq!(json["query"], "nioda");
        assert_eq!(json["properties"][0]["property"], "Moustache Delhi");
        assert!(json["properties"][0]["distance_km"].is_number());
        assert!(json["message"].is_null());
    }

    #[test]
    fn test_distance_rounded_to_two_places() {
        let (svc, _, _) = service();
        let d = svc.find_properties("noida").properties[0].distance_km;
        assert_eq!((d * 100.0).round() / 100.0, d);
    }

    #[test]
    fn test_empty_query() {
        let (svc, geocode, suggest) = service();

        for q in ["", "   ", "\t\n"] {
            let payload = svc.find_properties(q);
            assert!(payload.properties.is_empty());
            assert_eq!(payload.message.as_deref(), Some(EMPTY_QUERY_MESSAGE));
        }
        assert_eq!(geocode.calls(), 0);
        assert_eq!(suggest.calls(), 0);
    }

    #[test]
    fn test_nothing_within_radius() {
        let (svc, _, suggest) = service();

        // not in the vocabulary: goes through the suggestion service
        let payload = svc.find_properties("bombay");
        assert!(payload.properties.is_empty());
        assert_eq!(
            payload.message.as_deref(),
            Some("No properties found within 50 km radius.")
        );
        assert_eq!(suggest.calls(), 1);
    }

    #[test]
    fn test_unresolvable_location() {
        let (svc, _, _) = service_with(
            PropertyCatalog::builtin(),
            test_config(),
            FakeGeocoder::default(),
            FakeSuggester::answering(&[]),
        );

        let payload = svc.find_properties("Atlantis");
        assert!(payload.properties.is_empty());
        assert_eq!(payload.message.as_deref(), Some("Could not resolve location 'Atlantis'."));
    }

    #[test]
    fn test_geocoder_timeout() {
        let mut slow = FakeGeocoder::with_places(&[NOIDA]);
        slow.delay = Duration::from_secs(10);
        let mut config = test_config();
        config.geocoder.budget = Duration::from_millis(200);
        let (svc, _, _) = service_with(PropertyCatalog::builtin(), config, slow, FakeSuggester::answering(&[]));

        let start = Instant::now();
        let payload = svc.find_properties("noida");
        assert!(start.elapsed() < Duration::from_millis(600));
        assert!(payload.properties.is_empty());
        assert!(payload.message.is_some());
    }

    #[test]
    fn test_error_detail_not_leaked() {
        let geocode = FakeGeocoder::scripted(vec![Err(GeocodeError::MalformedResponse(
            "expected value at line 1 column 1".into(),
        ))]);
        let (svc, _, _) = service_with(PropertyCatalog::builtin(), test_config(), geocode, FakeSuggester::answering(&[]));

        let message = svc.find_properties("noida").message.unwrap();
        assert!(!message.contains("line 1"));
        assert!(message.contains("Noida"));
    }

    #[test]
    fn test_idempotent_with_warm_cache() {
        let (svc, geocode, _) = service();

        let first = svc.find_properties("Noida");
        let second = svc.find_properties("noida ");
        assert_eq!(first.properties, second.properties);
        assert_eq!(geocode.calls(), 1);
    }

    #[test]
    fn test_empty_catalog() {
        let (svc, geocode, suggest) = service_with(
            PropertyCatalog::new(vec![], vec![]).unwrap(),
            test_config(),
            FakeGeocoder::with_places(&[NOIDA]),
            FakeSuggester::answering(&[]),
        );

        let payload = svc.find_properties("noida");
        assert!(payload.properties.is_empty());
        assert_eq!(payload.message.as_deref(), Some(EMPTY_CATALOG_MESSAGE));
        assert_eq!(geocode.calls() + suggest.calls(), 0);
    }

    struct CaptureLog(Mutex<Vec<String>>);

    impl log::Log for CaptureLog {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }
        fn log(&self, record: &log::Record) {
            let line = format!("{} {}", record.level(), record.args());
            self.0.lock().unwrap_or_else(PoisonError::into_inner).push(line);
        }
        fn flush(&self) {}
    }

    static CAPTURED: CaptureLog = CaptureLog(Mutex::new(Vec::new()));

    fn capture_logs() {
        // Only one test installs a logger; other tests just add lines.
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Trace);
    }

    fn captured_lines(needle: &str) -> Vec<String> {
        CAPTURED
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.contains(needle))
            .cloned()
            .collect()
    }

    #[test]
    fn test_early_returns_are_logged() {
        capture_logs();
        let (svc, _, _) = service();
        svc.find_properties(" \t\t ");

        let empty_catalog = service_with(
            PropertyCatalog::new(vec![], vec![]).unwrap(),
            test_config(),
            FakeGeocoder::default(),
            FakeSuggester::answering(&[]),
        )
        .0;
        empty_catalog.find_properties("Zanzibar Quay");

        let lines = captured_lines("empty query");
        assert!(lines.iter().any(|l| l.starts_with("INFO") && l.contains(r#"" \t\t ""#)));
        let lines = captured_lines("Zanzibar Quay");
        assert!(lines.iter().any(|l| l.contains("empty catalog: 0 match(es)")));
    }

    #[test]
    fn test_custom_radius() {
        let catalog = PropertyCatalog::new(
            vec![Property { name: "Moustache Delhi".into(), latitude: 28.5700, longitude: 77.3400 }],
            vec!["Noida".into()],
        )
        .unwrap();
        let config = LocatorConfig { radius_km: 5.0, ..test_config() };
        let (svc, _, _) = service_with(catalog, config, FakeGeocoder::with_places(&[NOIDA]), FakeSuggester::answering(&[]));

        let payload = svc.find_properties("noida");
        assert!(payload.properties.is_empty());
        assert_eq!(payload.message.as_deref(), Some("No properties found within 5 km radius."));
    }

    #[test]
    fn test_eleventh_request_rate_limited() {
        let (svc, geocode, _) = service();

        for _ in 0..10 {
            assert!(svc.find_properties_for("203.0.113.7", "noida").is_ok());
        }
        let calls_before = geocode.calls();
        let err = svc.find_properties_for("203.0.113.7", "nioda").unwrap_err();
        assert!(err.retry_after > Duration::ZERO);
        assert_eq!(geocode.calls(), calls_before);

        // other clients unaffected
        assert!(svc.find_properties_for("198.51.100.2", "noida").is_ok());
    }

    #[test]
    fn test_concurrent_requests() {
        let (svc, _, _) = service();
        let svc = Arc::new(svc);

        let handles: Vec<_> = ["nioda", "", "bombay", "Noida"]
            .into_iter()
            .map(|q| {
                let svc = Arc::clone(&svc);
                std::thread::spawn(move || svc.find_properties(q))
            })
            .collect();
        let payloads: Vec<ResponsePayload> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(payloads[0].properties.len(), 1);
        assert!(payloads[1].message.is_some());
        assert!(payloads[2].properties.is_empty());
        assert_eq!(payloads[3].properties, payloads[0].properties);
    }
}

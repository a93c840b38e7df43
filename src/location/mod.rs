//! Query resolution: spell correction and geocoding.
//!
//! Provides the catalog-aware spell corrector, the cached and throttled
//! geocoder, and the external providers both rely on.

pub mod cache;
pub mod corrector;
pub mod geocoder;
pub mod providers;
pub mod throttle;
pub mod types;

pub use corrector::{CorrectorConfig, SpellCorrector};
pub use geocoder::{Geocoder, GeocoderConfig};
pub use providers::{GeocodeProvider, NominatimProvider, PhotonProvider, SuggestionProvider};
pub use types::{Coordinate, Correction, GeocodeError, MatchSource, ResolvedLocation, SuggestError};

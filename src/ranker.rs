//! Great-circle ranking of catalog properties around a point.
//!
//! Pure: no I/O, same inputs always give the same ordering.

use crate::catalog::{Property, PropertyCatalog};
use crate::location::Coordinate;
use std::cmp::Ordering;
use std::sync::Arc;

/// Mean Earth radius used by every distance in the crate.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const DEFAULT_RADIUS_KM: f64 = 50.0;

/// Haversine distance in kilometres.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = ((d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// A property and its distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub property: &'a Property,
    pub distance_km: f64,
}

pub struct DistanceRanker {
    catalog: Arc<PropertyCatalog>,
}

impl DistanceRanker {
    pub fn new(catalog: Arc<PropertyCatalog>) -> Self {
        Self { catalog }
    }

    /// Properties within `radius_km` of `origin`, nearest first, ties by name.
    pub fn rank(&self, origin: Coordinate, radius_km: f64) -> Vec<MatchResult<'_>> {
        let mut matches: Vec<MatchResult<'_>> = self
            .catalog
            .properties()
            .iter()
            .map(|p| MatchResult {
                property: p,
                distance_km: haversine_km(origin, Coordinate::new(p.latitude, p.longitude)),
            })
            .filter(|m| m.distance_km <= radius_km)
            .collect();

        matches.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.property.name.cmp(&b.property.name))
        });
        matches
    }
}

//! The property catalog: known properties with coordinates, plus the
//! vocabulary of place names the spell corrector matches against.
//!
//! Ships with a built-in dataset; a JSON file can replace it at startup.
//! The catalog is read-only once loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ─── Built-in dataset ───────────────────────────────────────────

struct BuiltinProperty {
    name: &'static str,
    lat: f64,
    lon: f64,
}

const BUILTIN_PROPERTIES: &[BuiltinProperty] = &[
    BuiltinProperty { name: "Moustache Udaipur", lat: 24.5796, lon: 73.6836 },
    BuiltinProperty { name: "Moustache Jaipur", lat: 26.9239, lon: 75.8267 },
    BuiltinProperty { name: "Moustache Jaisalmer", lat: 26.9124, lon: 70.9110 },
    BuiltinProperty { name: "Moustache Jodhpur", lat: 26.2978, lon: 73.0240 },
    BuiltinProperty { name: "Moustache Agra", lat: 27.1676, lon: 78.0421 },
    BuiltinProperty { name: "Moustache Delhi", lat: 28.5700, lon: 77.3400 },
    BuiltinProperty { name: "Moustache Rishikesh", lat: 30.1290, lon: 78.3230 },
    BuiltinProperty { name: "Moustache Varanasi", lat: 25.3060, lon: 83.0100 },
    BuiltinProperty { name: "Moustache Goa", lat: 15.5937, lon: 73.7400 },
    BuiltinProperty { name: "Moustache Koksar", lat: 32.4108, lon: 77.2466 },
    BuiltinProperty { name: "Moustache Daman", lat: 20.4283, lon: 72.8397 },
    BuiltinProperty { name: "Moustache Pushkar", lat: 26.4897, lon: 74.5511 },
    BuiltinProperty { name: "Moustache Khajuraho", lat: 24.8318, lon: 79.9199 },
    BuiltinProperty { name: "Moustache Manali", lat: 32.2480, lon: 77.1800 },
    BuiltinProperty { name: "Moustache Bhimtal", lat: 29.3446, lon: 79.5630 },
    BuiltinProperty { name: "Moustache Srinagar", lat: 34.0837, lon: 74.7973 },
    BuiltinProperty { name: "Moustache Ranthambore", lat: 26.0173, lon: 76.5026 },
    BuiltinProperty { name: "Moustache Coimbatore", lat: 11.0168, lon: 76.9558 },
    BuiltinProperty { name: "Moustache Shoja", lat: 31.5690, lon: 77.3720 },
    BuiltinProperty { name: "Moustache Sissu", lat: 32.4800, lon: 77.1250 },
];

/// Destinations the built-in properties are placed around.
const KNOWN_PLACES: &[&str] = &[
    "Udaipur", "Jaipur", "Jaisalmer", "Jodhpur", "Agra", "Delhi", "Rishikesh",
    "Varanasi", "Goa", "Koksar", "Daman", "Pushkar", "Khajuraho",
    "Manali", "Bhimtal", "Srinagar", "Ranthambore", "Coimbatore", "Shoja", "Sissu",
    // satellite cities served by the Delhi property
    "Noida", "New Delhi", "Gurugram",
];

// ─── Types ──────────────────────────────────────────────────────

/// A known hotel property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Catalog loading errors. Only ever raised at startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate property name '{0}'")]
    DuplicateName(String),
    #[error("property '{name}' has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinate { name: String, lat: f64, lon: f64 },
    #[error("catalog contains a blank name")]
    BlankName,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    places: Vec<String>,
    properties: Vec<Property>,
}

/// Immutable list of properties and known place names.
#[derive(Debug, Clone)]
pub struct PropertyCatalog {
    properties: Vec<Property>,
    places: Vec<String>,
}

impl PropertyCatalog {
    /// Build and validate a catalog.
    pub fn new(properties: Vec<Property>, places: Vec<String>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for p in &properties {
            if p.name.trim().is_empty() {
                return Err(CatalogError::BlankName);
            }
            if !(-90.0..=90.0).contains(&p.latitude) || !(-180.0..=180.0).contains(&p.longitude) {
                return Err(CatalogError::InvalidCoordinate {
                    name: p.name.clone(),
                    lat: p.latitude,
                    lon: p.longitude,
                });
            }
            if !seen.insert(p.name.trim().to_lowercase()) {
                return Err(CatalogError::DuplicateName(p.name.clone()));
            }
        }
        if places.iter().any(|p| p.trim().is_empty()) {
            return Err(CatalogError::BlankName);
        }
        Ok(Self { properties, places })
    }

    /// The dataset compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            properties: BUILTIN_PROPERTIES
                .iter()
                .map(|p| Property {
                    name: p.name.to_string(),
                    latitude: p.lat,
                    longitude: p.lon,
                })
                .collect(),
            places: KNOWN_PLACES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse a catalog from its JSON form.
    pub fn from_json(data: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(data)?;
        Self::new(file.properties, file.places)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Place names and property names, de-duplicated case-insensitively,
    /// first spelling wins.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.places
            .iter()
            .chain(self.properties.iter().map(|p| &p.name))
            .filter(|name| seen.insert(name.trim().to_lowercase()))
            .map(|name| name.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prop(name: &str, lat: f64, lon: f64) -> Property {
        Property { name: name.into(), latitude: lat, longitude: lon }
    }

    #[test]
    fn test_builtin_is_valid() {
        let builtin = PropertyCatalog::builtin();
        let rebuilt = PropertyCatalog::new(builtin.properties.clone(), builtin.places.clone());
        assert!(rebuilt.is_ok());
        assert_eq!(builtin.len(), 20);
    }

    #[test]
    fn test_builtin_has_delhi() {
        let catalog = PropertyCatalog::builtin();
        let delhi = catalog
            .properties()
            .iter()
            .find(|p| p.name == "Moustache Delhi")
            .unwrap();
        assert!((delhi.latitude - 28.57).abs() < 0.01);
    }

    #[test]
    fn test_vocabulary_dedup() {
        let catalog = PropertyCatalog::new(
            vec![prop("Goa", 15.0, 73.0), prop("Moustache Goa", 15.5, 73.7)],
            vec!["Goa".into(), "goa".into(), "Noida".into()],
        )
        .unwrap();
        let vocab = catalog.vocabulary();
        assert_eq!(vocab, vec!["Goa", "Noida", "Moustache Goa"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = PropertyCatalog::new(
            vec![prop("Moustache Agra", 27.0, 78.0), prop("moustache agra ", 27.1, 78.1)],
            vec![],
        );
        assert!(matches!(result, Err(CatalogError::DuplicateName(_))));
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let result = PropertyCatalog::new(vec![prop("Nowhere", 91.0, 0.0)], vec![]);
        assert!(matches!(result, Err(CatalogError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_blank_place_rejected() {
        let result = PropertyCatalog::new(vec![], vec!["  ".into()]);
        assert!(matches!(result, Err(CatalogError::BlankName)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "places": ["Leh"],
                "properties": [
                    {"name": "Moustache Leh", "latitude": 34.1526, "longitude": 77.5771}
                ]
            }"#,
        )
        .unwrap();

        let catalog = PropertyCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.vocabulary(), vec!["Leh", "Moustache Leh"]);
    }

    #[test]
    fn test_places_optional_in_file() {
        let catalog = PropertyCatalog::from_json(r#"{"properties": []}"#).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.vocabulary().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = PropertyCatalog::load(Path::new("/nonexistent/catalog.json"));
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }

    #[test]
    fn test_malformed_file() {
        let result = PropertyCatalog::from_json("{not json");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }
}

//! Property locator: finds hotel properties near a possibly misspelled
//! place name.
//!
//! The pipeline corrects the query against the catalog vocabulary (falling
//! back to an autocomplete service), geocodes the corrected text, and ranks
//! catalog properties by great-circle distance within a radius.

pub mod catalog;
pub mod location;
pub mod locator;
pub mod ranker;
pub mod rate_limit;
pub mod server;

pub use catalog::{CatalogError, Property, PropertyCatalog};
pub use locator::{LocatorConfig, LocatorService, PropertyMatch, ResponsePayload};

//! Core data types for the geodata open-data API.
//!
//! This crate holds the domain vocabulary shared by the cache/refresh
//! service and the REST layer: housing metric and housing-type enums
//! with their wire-parameter mappings, the cache/snapshot entities,
//! the housing filter, and the CCAA region table.

pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;
pub mod regions;

pub use entities::{CacheEntry, HousingKey, NewHousingRow, Period, SnapshotEntry};
pub use enums::{DataSource, HousingMetric, HousingTipo};
pub use error::HousingParseError;
pub use filter::HousingFilter;
pub use regions::{ccaa_name, CCAA_CODES, NATIONAL_CCAA_CODE};

/// Timestamp type used throughout geodata (UTC).
pub type Timestamp = chrono::DateTime<chrono::Utc>;

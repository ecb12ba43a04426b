//! Entity types for the housing cache and snapshot ledger.
//!
//! `CacheEntry` rows form the single current generation; `SnapshotEntry`
//! rows are frozen copies of superseded generations. Both carry the same
//! measurement attributes; they differ only in the generation timestamp
//! they are tagged with.

use crate::error::HousingParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PERIOD
// ============================================================================

/// A quarterly period label of the INE feed, e.g. "2024T3".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Period {
    pub anio: i32,
    pub trimestre: i32,
}

impl Period {
    /// Create a period, validating the quarter.
    pub fn new(anio: i32, trimestre: i32) -> Result<Self, HousingParseError> {
        if !(1..=4).contains(&trimestre) {
            return Err(HousingParseError::QuarterOutOfRange(trimestre));
        }
        Ok(Self { anio, trimestre })
    }

    /// Parse a "YYYYTQ" label as published by the INE.
    pub fn parse(label: &str) -> Result<Self, HousingParseError> {
        let label = label.trim();
        let (anio_str, trimestre_str) = label
            .split_once('T')
            .ok_or_else(|| HousingParseError::InvalidPeriod(label.to_string()))?;
        let anio: i32 = anio_str
            .parse()
            .map_err(|_| HousingParseError::InvalidPeriod(label.to_string()))?;
        let trimestre: i32 = trimestre_str
            .parse()
            .map_err(|_| HousingParseError::InvalidPeriod(label.to_string()))?;
        Self::new(anio, trimestre)
    }

    /// The "YYYYTQ" label.
    pub fn label(&self) -> String {
        format!("{}T{}", self.anio, self.trimestre)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.anio, self.trimestre)
    }
}

// ============================================================================
// NATURAL KEY
// ============================================================================

/// Natural key of one measurement inside a generation.
///
/// Unique within the cache store at any time; intentionally repeatable
/// across snapshot dates in the snapshot ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HousingKey {
    pub periodo: String,
    pub ccaa_codigo: String,
    pub tipo_vivienda: String,
    pub metrica: String,
}

// ============================================================================
// ROWS
// ============================================================================

/// A normalized row produced by the external data fetcher.
///
/// The fetcher resolves region codes, parses numeric values and splits
/// the period; the cache service does no parsing of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewHousingRow {
    pub periodo: String,
    pub anio: i32,
    pub trimestre: i32,
    pub ccaa_codigo: String,
    pub ccaa_nombre: String,
    pub tipo_vivienda: String,
    pub metrica: String,
    pub valor: Option<f64>,
}

impl NewHousingRow {
    /// The natural key of this row.
    pub fn key(&self) -> HousingKey {
        HousingKey {
            periodo: self.periodo.clone(),
            ccaa_codigo: self.ccaa_codigo.clone(),
            tipo_vivienda: self.tipo_vivienda.clone(),
            metrica: self.metrica.clone(),
        }
    }
}

/// One row of the current cache generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheEntry {
    pub periodo: String,
    pub anio: i32,
    pub trimestre: i32,
    pub ccaa_codigo: String,
    pub ccaa_nombre: String,
    pub tipo_vivienda: String,
    pub metrica: String,
    pub valor: Option<f64>,
    /// Timestamp of the generation this row belongs to.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build a cache entry from a fetched row, stamping the generation time.
    pub fn from_row(row: &NewHousingRow, cached_at: DateTime<Utc>) -> Self {
        Self {
            periodo: row.periodo.clone(),
            anio: row.anio,
            trimestre: row.trimestre,
            ccaa_codigo: row.ccaa_codigo.clone(),
            ccaa_nombre: row.ccaa_nombre.clone(),
            tipo_vivienda: row.tipo_vivienda.clone(),
            metrica: row.metrica.clone(),
            valor: row.valor,
            cached_at,
        }
    }

    /// The natural key of this entry.
    pub fn key(&self) -> HousingKey {
        HousingKey {
            periodo: self.periodo.clone(),
            ccaa_codigo: self.ccaa_codigo.clone(),
            tipo_vivienda: self.tipo_vivienda.clone(),
            metrica: self.metrica.clone(),
        }
    }
}

/// A frozen copy of one cache entry inside a superseded generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SnapshotEntry {
    pub periodo: String,
    pub anio: i32,
    pub trimestre: i32,
    pub ccaa_codigo: String,
    pub ccaa_nombre: String,
    pub tipo_vivienda: String,
    pub metrica: String,
    pub valor: Option<f64>,
    /// When this generation was captured, i.e. superseded.
    pub snapshot_date: DateTime<Utc>,
}

impl SnapshotEntry {
    /// Freeze a cache entry into the ledger under the shared snapshot date.
    pub fn from_cache(entry: &CacheEntry, snapshot_date: DateTime<Utc>) -> Self {
        Self {
            periodo: entry.periodo.clone(),
            anio: entry.anio,
            trimestre: entry.trimestre,
            ccaa_codigo: entry.ccaa_codigo.clone(),
            ccaa_nombre: entry.ccaa_nombre.clone(),
            tipo_vivienda: entry.tipo_vivienda.clone(),
            metrica: entry.metrica.clone(),
            valor: entry.valor,
            snapshot_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_row() -> NewHousingRow {
        NewHousingRow {
            periodo: "2024T3".to_string(),
            anio: 2024,
            trimestre: 3,
            ccaa_codigo: "13".to_string(),
            ccaa_nombre: "Madrid, Comunidad de".to_string(),
            tipo_vivienda: "General".to_string(),
            metrica: "Índice".to_string(),
            valor: Some(112.5),
        }
    }

    #[test]
    fn test_period_parse() {
        let p = Period::parse("2024T3").unwrap();
        assert_eq!(p.anio, 2024);
        assert_eq!(p.trimestre, 3);
        assert_eq!(p.label(), "2024T3");
    }

    #[test]
    fn test_period_parse_rejects_garbage() {
        assert!(Period::parse("2024").is_err());
        assert!(Period::parse("T3").is_err());
        assert!(Period::parse("2024T5").is_err());
        assert!(Period::parse("abcdT1").is_err());
        assert!(Period::parse("").is_err());
    }

    #[test]
    fn test_period_ordering() {
        let older = Period::new(2023, 4).unwrap();
        let newer = Period::new(2024, 1).unwrap();
        assert!(newer > older);
    }

    #[test]
    fn test_cache_entry_from_row_keeps_key() {
        let row = sample_row();
        let entry = CacheEntry::from_row(&row, Utc::now());
        assert_eq!(entry.key(), row.key());
        assert_eq!(entry.valor, Some(112.5));
    }

    #[test]
    fn test_snapshot_from_cache_tags_shared_date() {
        let entry = CacheEntry::from_row(&sample_row(), Utc::now());
        let date = Utc::now();
        let snap = SnapshotEntry::from_cache(&entry, date);
        assert_eq!(snap.snapshot_date, date);
        assert_eq!(snap.periodo, entry.periodo);
        assert_eq!(snap.valor, entry.valor);
    }

    proptest! {
        #[test]
        fn prop_period_label_roundtrip(anio in 1990i32..2100, trimestre in 1i32..=4) {
            let period = Period::new(anio, trimestre).unwrap();
            let reparsed = Period::parse(&period.label()).unwrap();
            prop_assert_eq!(period, reparsed);
        }

        #[test]
        fn prop_period_rejects_bad_quarter(anio in 1990i32..2100, trimestre in 5i32..100) {
            prop_assert!(Period::new(anio, trimestre).is_err());
        }
    }
}

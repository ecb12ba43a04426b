//! Enum types for housing data.
//!
//! The INE feed labels metrics and housing types with Spanish strings
//! ("Índice", "Vivienda nueva", ...). The REST API accepts short ASCII
//! parameters ("indice", "nueva", ...). Both mappings live here so the
//! rest of the codebase never handles raw label strings.

use crate::error::HousingParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// HOUSING METRIC
// ============================================================================

/// Metric category of the INE housing price index dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum HousingMetric {
    /// Index, base 2015 = 100
    Index,
    /// Percent change vs. previous quarter
    QuarterlyChange,
    /// Percent change vs. same quarter of previous year
    AnnualChange,
    /// Accumulated percent change within the current year
    YearToDateChange,
}

impl HousingMetric {
    /// Canonical label as it appears in the INE feed and in storage.
    pub fn as_label(&self) -> &'static str {
        match self {
            HousingMetric::Index => "Índice",
            HousingMetric::QuarterlyChange => "Variación trimestral",
            HousingMetric::AnnualChange => "Variación anual",
            HousingMetric::YearToDateChange => "Variación en lo que va de año",
        }
    }

    /// Short parameter accepted on the wire (`?metric=...`).
    pub fn as_api_param(&self) -> &'static str {
        match self {
            HousingMetric::Index => "indice",
            HousingMetric::QuarterlyChange => "var_trimestral",
            HousingMetric::AnnualChange => "var_anual",
            HousingMetric::YearToDateChange => "var_ytd",
        }
    }

    /// Parse the wire parameter, case-insensitive.
    pub fn from_api_param(s: &str) -> Result<Self, HousingParseError> {
        match s.to_lowercase().as_str() {
            "indice" => Ok(HousingMetric::Index),
            "var_trimestral" => Ok(HousingMetric::QuarterlyChange),
            "var_anual" => Ok(HousingMetric::AnnualChange),
            "var_ytd" => Ok(HousingMetric::YearToDateChange),
            other => Err(HousingParseError::UnknownMetric(other.to_string())),
        }
    }

    /// Parse the canonical label used by the INE feed.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "Índice" => Some(HousingMetric::Index),
            "Variación trimestral" => Some(HousingMetric::QuarterlyChange),
            "Variación anual" => Some(HousingMetric::AnnualChange),
            "Variación en lo que va de año" => Some(HousingMetric::YearToDateChange),
            _ => None,
        }
    }

    /// Human description, served by the metadata endpoint.
    pub fn description(&self) -> &'static str {
        match self {
            HousingMetric::Index => "Índice base 2015=100",
            HousingMetric::QuarterlyChange => {
                "Variación porcentual respecto al trimestre anterior"
            }
            HousingMetric::AnnualChange => {
                "Variación porcentual respecto al mismo trimestre del año anterior"
            }
            HousingMetric::YearToDateChange => "Variación porcentual acumulada en el año",
        }
    }

    /// All variants, in feed order.
    pub fn all() -> [HousingMetric; 4] {
        [
            HousingMetric::Index,
            HousingMetric::QuarterlyChange,
            HousingMetric::AnnualChange,
            HousingMetric::YearToDateChange,
        ]
    }
}

impl fmt::Display for HousingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for HousingMetric {
    type Err = HousingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_api_param(s)
    }
}

// ============================================================================
// HOUSING TYPE
// ============================================================================

/// Housing type category of the INE dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum HousingTipo {
    /// Overall index
    General,
    /// Newly built housing
    New,
    /// Second-hand housing
    Resale,
}

impl HousingTipo {
    /// Canonical label as it appears in the INE feed and in storage.
    pub fn as_label(&self) -> &'static str {
        match self {
            HousingTipo::General => "General",
            HousingTipo::New => "Vivienda nueva",
            HousingTipo::Resale => "Vivienda segunda mano",
        }
    }

    /// Short parameter accepted on the wire (`?housing_type=...`).
    pub fn as_api_param(&self) -> &'static str {
        match self {
            HousingTipo::General => "general",
            HousingTipo::New => "nueva",
            HousingTipo::Resale => "segunda_mano",
        }
    }

    /// Parse the wire parameter, case-insensitive.
    pub fn from_api_param(s: &str) -> Result<Self, HousingParseError> {
        match s.to_lowercase().as_str() {
            "general" => Ok(HousingTipo::General),
            "nueva" => Ok(HousingTipo::New),
            "segunda_mano" => Ok(HousingTipo::Resale),
            other => Err(HousingParseError::UnknownHousingType(other.to_string())),
        }
    }

    /// Parse the canonical label used by the INE feed.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "General" => Some(HousingTipo::General),
            "Vivienda nueva" => Some(HousingTipo::New),
            "Vivienda segunda mano" => Some(HousingTipo::Resale),
            _ => None,
        }
    }

    /// Human description, served by the metadata endpoint.
    pub fn description(&self) -> &'static str {
        match self {
            HousingTipo::General => "Índice general de precios de vivienda",
            HousingTipo::New => "Vivienda de nueva construcción",
            HousingTipo::Resale => "Vivienda de segunda mano",
        }
    }

    /// All variants, in feed order.
    pub fn all() -> [HousingTipo; 3] {
        [HousingTipo::General, HousingTipo::New, HousingTipo::Resale]
    }
}

impl fmt::Display for HousingTipo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for HousingTipo {
    type Err = HousingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_api_param(s)
    }
}

// ============================================================================
// DATA SOURCE
// ============================================================================

/// Where a housing response was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Served from the current cache generation.
    Cache,
    /// Freshly downloaded from the INE and written through the cache.
    Ine,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Cache => f.write_str("cache"),
            DataSource::Ine => f.write_str("ine"),
        }
    }
}

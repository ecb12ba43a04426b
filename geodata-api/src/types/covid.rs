//! Covid endpoint wire types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One covid case row with coordinates extracted from the PostGIS geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidRecord {
    pub fecha: NaiveDate,
    pub comunidad: String,
    pub provincia: Option<String>,
    pub casos: i32,
    pub ingresos_uci: Option<i32>,
    pub fallecidos: Option<i32>,
    pub altas: Option<i32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Response for GET /api/covid/data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidDataResponse {
    pub data: Vec<CovidRecord>,
}

/// Per-community aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidCommunityTotals {
    pub comunidad: String,
    pub total_casos: i64,
    pub total_fallecidos: i64,
    pub promedio_diario: f64,
}

/// Per-province aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidProvinceTotals {
    pub provincia: Option<String>,
    pub comunidad: String,
    pub total_casos: i64,
    pub total_fallecidos: i64,
}

/// National totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidTotals {
    pub total_casos: i64,
    pub total_fallecidos: i64,
    pub total_uci: i64,
    pub dias_registrados: i64,
}

/// Response for GET /api/covid/stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidStatsResponse {
    pub por_comunidad: Vec<CovidCommunityTotals>,
    pub por_provincia: Vec<CovidProvinceTotals>,
    pub totales: CovidTotals,
}

/// Query parameters for GET /api/covid/filter.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct CovidFilterQuery {
    /// Community name substring ("todas" = no filter)
    pub comunidad: Option<String>,
    /// Province name substring ("todas" = no filter)
    pub provincia: Option<String>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub min_casos: Option<i32>,
    pub max_casos: Option<i32>,
}

/// Echo of the filters applied to a /api/covid/filter request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidFiltersApplied {
    pub comunidad: Option<String>,
    pub provincia: Option<String>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub min_casos: Option<i32>,
    pub max_casos: Option<i32>,
}

/// Response for GET /api/covid/filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CovidFilterResponse {
    pub data: Vec<CovidRecord>,
    pub filters_applied: CovidFiltersApplied,
    pub count: usize,
    pub total_casos: i64,
}

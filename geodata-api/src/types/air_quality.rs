//! Air-quality endpoint wire types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    100
}

fn default_pollutant() -> String {
    "PM2.5".to_string()
}

fn default_true() -> bool {
    true
}

/// Query parameters for GET /api/air-quality/stations.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct StationsQuery {
    #[serde(default = "default_limit")]
    pub limite: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_pollutant")]
    pub contaminante: String,
    /// Map-ready subset
    #[serde(default)]
    pub light: bool,
    /// Drop stations without a current ICA index
    #[serde(default = "default_true")]
    pub solo_con_datos: bool,
    /// Skip the upstream download and serve simulated stations
    #[serde(default)]
    pub forzar_mock: bool,
}

/// Query parameters for GET /api/air-quality/stats.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AirQualityStatsQuery {
    #[serde(default = "default_pollutant")]
    pub contaminante: String,
    #[serde(default)]
    pub forzar_mock: bool,
}

/// Unified air-quality station record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Station {
    pub id: i64,
    pub station_code: String,
    pub eoi_code: String,
    pub name: String,
    pub country_code: String,
    pub country: String,
    pub station_class: i32,
    pub station_type: String,
    pub lat: f64,
    pub lon: f64,
    pub available_pollutants: Vec<String>,
    pub last_measurement: Option<f64>,
    pub last_aqi: i32,
    pub pollutant: Option<String>,
    pub unit: Option<String>,
    pub quality_text: String,
    pub quality_color: String,
    pub recommendation: String,
    pub last_updated: String,
    pub is_mock: bool,
    pub has_real_data: bool,
    pub is_active: bool,
    pub data_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ica_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ica_contaminant: Option<String>,
}

/// Map-ready subset returned in light mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StationLight {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub last_aqi: i32,
    pub quality_color: String,
    pub pollutant: Option<String>,
    pub station_code: String,
    pub is_active: bool,
}

impl From<&Station> for StationLight {
    fn from(s: &Station) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            lat: s.lat,
            lon: s.lon,
            last_aqi: s.last_aqi,
            quality_color: s.quality_color.clone(),
            pollutant: s.pollutant.clone(),
            station_code: s.station_code.clone(),
            is_active: s.is_active,
        }
    }
}

/// Rows of a stations response (shape depends on light mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum StationRows {
    Full(Vec<Station>),
    Light(Vec<StationLight>),
}

impl StationRows {
    pub fn len(&self) -> usize {
        match self {
            StationRows::Full(rows) => rows.len(),
            StationRows::Light(rows) => rows.len(),
        }
    }
}

/// Response for GET /api/air-quality/stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StationsResponse {
    pub success: bool,
    pub count: usize,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub pollutant: String,
    pub description: String,
    pub is_mock_data: bool,
    pub data_source: String,
    pub light_mode: bool,
    pub stations: StationRows,
}

/// Response for GET /api/air-quality/station/{id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StationDetailResponse {
    pub success: bool,
    pub data: Station,
    pub is_mock_data: bool,
}

/// Response for GET /api/air-quality/stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AirQualityStatsResponse {
    pub pollutant: String,
    pub total_stations: usize,
    pub stations_with_data: usize,
    pub avg_concentration: f64,
    pub min_concentration: f64,
    pub max_concentration: f64,
    pub quality_distribution: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
    pub is_mock_data: bool,
}

/// Response for GET /api/air-quality/health.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AirQualityHealthResponse {
    pub status: String,
    pub message: String,
    pub is_mock: bool,
    pub stations: usize,
    pub stations_with_data: usize,
    pub timestamp: DateTime<Utc>,
}

/// Response for GET /api/air-quality/pollutants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PollutantsResponse {
    pub pollutants: BTreeMap<String, String>,
    pub units: String,
    pub source: String,
    pub update_frequency: String,
    pub real_data_available: bool,
}

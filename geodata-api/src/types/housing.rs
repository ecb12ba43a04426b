//! Housing endpoint wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use geodata_core::{CacheEntry, DataSource, SnapshotEntry};

fn default_metric() -> String {
    "indice".to_string()
}

fn default_housing_type() -> String {
    "general".to_string()
}

fn default_limit() -> usize {
    100
}

/// Query parameters for GET /api/housing/data.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct HousingDataQuery {
    /// Metric wire parameter: indice | var_trimestral | var_anual | var_ytd
    #[serde(default = "default_metric")]
    pub metric: String,
    /// Housing type wire parameter: general | nueva | segunda_mano
    #[serde(default = "default_housing_type")]
    pub housing_type: String,
    /// Region code ("00" = national aggregate only; absent = all regions)
    pub ccaa: Option<String>,
    pub anio_desde: Option<i32>,
    pub anio_hasta: Option<i32>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

/// Query parameters for GET /api/housing/snapshots/data.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SnapshotDataQuery {
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_housing_type")]
    pub housing_type: String,
    pub ccaa: Option<String>,
    /// Pin the most recent snapshot generation at or before this instant.
    pub as_of: Option<DateTime<Utc>>,
}

/// One housing data row on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HousingRecord {
    pub periodo: String,
    pub anio: i32,
    pub trimestre: i32,
    pub ccaa_codigo: String,
    pub ccaa_nombre: String,
    pub tipo_vivienda: String,
    pub metrica: String,
    pub valor: Option<f64>,
}

impl From<&CacheEntry> for HousingRecord {
    fn from(e: &CacheEntry) -> Self {
        Self {
            periodo: e.periodo.clone(),
            anio: e.anio,
            trimestre: e.trimestre,
            ccaa_codigo: e.ccaa_codigo.clone(),
            ccaa_nombre: e.ccaa_nombre.clone(),
            tipo_vivienda: e.tipo_vivienda.clone(),
            metrica: e.metrica.clone(),
            valor: e.valor,
        }
    }
}

/// Response for GET /api/housing/data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HousingDataResponse {
    pub success: bool,
    /// Rows in this page.
    pub count: usize,
    /// Rows matching the filter before pagination.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub data: Vec<HousingRecord>,
    /// Where this response was served from.
    pub source: DataSource,
}

/// Response for GET /api/housing/metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HousingMetadataResponse {
    pub dataset_name: String,
    pub source: String,
    pub data_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodo_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodo_max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipos_vivienda: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metricas: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ccaa_count: Option<usize>,
}

/// Response for GET /api/housing/snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SnapshotDatesResponse {
    pub success: bool,
    pub count: usize,
    pub dates: Vec<DateTime<Utc>>,
}

/// One snapshot row on the wire (a housing row plus its snapshot date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SnapshotRecord {
    pub periodo: String,
    pub anio: i32,
    pub trimestre: i32,
    pub ccaa_codigo: String,
    pub ccaa_nombre: String,
    pub tipo_vivienda: String,
    pub metrica: String,
    pub valor: Option<f64>,
    pub snapshot_date: DateTime<Utc>,
}

impl From<&SnapshotEntry> for SnapshotRecord {
    fn from(s: &SnapshotEntry) -> Self {
        Self {
            periodo: s.periodo.clone(),
            anio: s.anio,
            trimestre: s.trimestre,
            ccaa_codigo: s.ccaa_codigo.clone(),
            ccaa_nombre: s.ccaa_nombre.clone(),
            tipo_vivienda: s.tipo_vivienda.clone(),
            metrica: s.metrica.clone(),
            valor: s.valor,
            snapshot_date: s.snapshot_date,
        }
    }
}

/// Response for GET /api/housing/snapshots/data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SnapshotDataResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<SnapshotRecord>,
}

/// Response for DELETE /api/housing/cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClearCacheResponse {
    pub success: bool,
    pub rows_removed: u64,
}

/// Response for GET /api/housing/health.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HousingHealthResponse {
    pub status: String,
    pub records: usize,
    pub fresh: bool,
    pub timestamp: DateTime<Utc>,
}

//! Housing Price Endpoints
//!
//! The housing dataset is served through the lazy-refresh cache: a
//! fresh generation is served directly, a stale or empty one triggers
//! an upstream INE fetch and an atomic generation swap. Every swap
//! freezes the outgoing generation into the snapshot ledger, which the
//! snapshot endpoints expose read-only.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

use geodata_core::{HousingFilter, HousingMetric, HousingTipo};
use geodata_store::{HousingCacheService, HousingFetcher};

use crate::error::{ApiError, ApiResult};
use crate::types::{
    ClearCacheResponse, HousingDataQuery, HousingDataResponse, HousingHealthResponse,
    HousingMetadataResponse, HousingRecord, SnapshotDataQuery, SnapshotDataResponse,
    SnapshotDatesResponse, SnapshotRecord,
};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct HousingState {
    pub service: HousingCacheService,
    pub fetcher: Arc<dyn HousingFetcher>,
}

impl HousingState {
    pub fn new(service: HousingCacheService, fetcher: Arc<dyn HousingFetcher>) -> Self {
        Self { service, fetcher }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Parse the wire metric/housing_type/year parameters into a typed
/// filter, rejecting unknown values with 400.
fn parse_filter(
    metric: &str,
    housing_type: &str,
    ccaa: Option<&str>,
    anio_desde: Option<i32>,
    anio_hasta: Option<i32>,
) -> ApiResult<HousingFilter> {
    let metric = HousingMetric::from_api_param(metric).map_err(|_| {
        ApiError::invalid_filter("metric", metric).with_details(serde_json::json!({
            "valid_values": HousingMetric::all()
                .iter()
                .map(|m| m.as_api_param())
                .collect::<Vec<_>>(),
        }))
    })?;
    let tipo = HousingTipo::from_api_param(housing_type).map_err(|_| {
        ApiError::invalid_filter("housing_type", housing_type).with_details(serde_json::json!({
            "valid_values": HousingTipo::all()
                .iter()
                .map(|t| t.as_api_param())
                .collect::<Vec<_>>(),
        }))
    })?;

    if let (Some(desde), Some(hasta)) = (anio_desde, anio_hasta) {
        if desde > hasta {
            return Err(ApiError::invalid_input(format!(
                "anio_desde ({}) must not exceed anio_hasta ({})",
                desde, hasta,
            )));
        }
    }

    let mut filter = HousingFilter::new(metric, tipo);
    if let Some(ccaa) = ccaa {
        filter = filter.with_ccaa(ccaa);
    }
    Ok(filter.with_years(anio_desde, anio_hasta))
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/housing/data - Housing prices through the lazy-refresh cache
#[utoipa::path(
    get,
    path = "/api/housing/data",
    tag = "Housing",
    params(HousingDataQuery),
    responses(
        (status = 200, description = "Housing data page", body = HousingDataResponse),
        (status = 400, description = "Invalid filter parameter", body = ApiError),
        (status = 503, description = "Upstream unavailable and cache empty", body = ApiError),
    ),
)]
pub async fn get_data(
    State(state): State<HousingState>,
    Query(q): Query<HousingDataQuery>,
) -> ApiResult<Json<HousingDataResponse>> {
    let filter = parse_filter(
        &q.metric,
        &q.housing_type,
        q.ccaa.as_deref(),
        q.anio_desde,
        q.anio_hasta,
    )?;

    let (entries, source) = state
        .service
        .current_data(&filter, state.fetcher.as_ref())
        .await?;

    let total = entries.len();
    let data: Vec<HousingRecord> = entries
        .iter()
        .skip(q.offset)
        .take(q.limit)
        .map(HousingRecord::from)
        .collect();

    Ok(Json(HousingDataResponse {
        success: true,
        count: data.len(),
        total,
        offset: q.offset,
        limit: q.limit,
        data,
        source,
    }))
}

/// GET /api/housing/metadata - Dataset shape of the current generation
#[utoipa::path(
    get,
    path = "/api/housing/metadata",
    tag = "Housing",
    responses(
        (status = 200, description = "Dataset metadata", body = HousingMetadataResponse),
    ),
)]
pub async fn get_metadata(
    State(state): State<HousingState>,
) -> ApiResult<Json<HousingMetadataResponse>> {
    let entries = state.service.read_all().await?;

    if entries.is_empty() {
        return Ok(Json(HousingMetadataResponse {
            dataset_name: "Índice de Precios de Vivienda (IPV)".to_string(),
            source: "INE".to_string(),
            data_available: false,
            total_records: None,
            periodo_min: None,
            periodo_max: None,
            tipos_vivienda: None,
            metricas: None,
            ccaa_count: None,
        }));
    }

    let periodos: BTreeSet<&str> = entries.iter().map(|e| e.periodo.as_str()).collect();
    let tipos: BTreeSet<String> = entries.iter().map(|e| e.tipo_vivienda.clone()).collect();
    let metricas: BTreeSet<String> = entries.iter().map(|e| e.metrica.clone()).collect();
    let ccaa: BTreeSet<&str> = entries.iter().map(|e| e.ccaa_codigo.as_str()).collect();

    Ok(Json(HousingMetadataResponse {
        dataset_name: "Índice de Precios de Vivienda (IPV)".to_string(),
        source: "INE".to_string(),
        data_available: true,
        total_records: Some(entries.len()),
        periodo_min: periodos.iter().next().map(|p| p.to_string()),
        periodo_max: periodos.iter().next_back().map(|p| p.to_string()),
        tipos_vivienda: Some(tipos.into_iter().collect()),
        metricas: Some(metricas.into_iter().collect()),
        ccaa_count: Some(ccaa.len()),
    }))
}

/// GET /api/housing/snapshots - Distinct snapshot dates, newest first
#[utoipa::path(
    get,
    path = "/api/housing/snapshots",
    tag = "Housing",
    responses(
        (status = 200, description = "Snapshot dates", body = SnapshotDatesResponse),
    ),
)]
pub async fn get_snapshot_dates(
    State(state): State<HousingState>,
) -> ApiResult<Json<SnapshotDatesResponse>> {
    let dates = state.service.snapshot_dates().await?;
    Ok(Json(SnapshotDatesResponse {
        success: true,
        count: dates.len(),
        dates,
    }))
}

/// GET /api/housing/snapshots/data - Read the snapshot ledger
#[utoipa::path(
    get,
    path = "/api/housing/snapshots/data",
    tag = "Housing",
    params(SnapshotDataQuery),
    responses(
        (status = 200, description = "Snapshot rows", body = SnapshotDataResponse),
        (status = 400, description = "Invalid filter parameter", body = ApiError),
    ),
)]
pub async fn get_snapshot_data(
    State(state): State<HousingState>,
    Query(q): Query<SnapshotDataQuery>,
) -> ApiResult<Json<SnapshotDataResponse>> {
    let filter = parse_filter(&q.metric, &q.housing_type, q.ccaa.as_deref(), None, None)?;

    let entries = state.service.read_snapshot(&filter, q.as_of).await?;
    let data: Vec<SnapshotRecord> = entries.iter().map(SnapshotRecord::from).collect();

    Ok(Json(SnapshotDataResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// DELETE /api/housing/cache - Drop the current generation
///
/// The next data request will fetch a fresh generation upstream. The
/// snapshot ledger is untouched.
#[utoipa::path(
    delete,
    path = "/api/housing/cache",
    tag = "Housing",
    responses(
        (status = 200, description = "Cache cleared", body = ClearCacheResponse),
    ),
)]
pub async fn clear_cache(
    State(state): State<HousingState>,
) -> ApiResult<Json<ClearCacheResponse>> {
    let rows_removed = state.service.clear().await?;
    Ok(Json(ClearCacheResponse {
        success: true,
        rows_removed,
    }))
}

/// GET /api/housing/health - Cache freshness and record count
#[utoipa::path(
    get,
    path = "/api/housing/health",
    tag = "Housing",
    responses(
        (status = 200, description = "Housing cache health", body = HousingHealthResponse),
    ),
)]
pub async fn health(State(state): State<HousingState>) -> ApiResult<impl IntoResponse> {
    let entries = state.service.read_all().await?;
    let fresh = state.service.is_fresh().await?;

    let status = if fresh { "healthy" } else { "degraded" };
    Ok((
        StatusCode::OK,
        Json(HousingHealthResponse {
            status: status.to_string(),
            records: entries.len(),
            fresh,
            timestamp: Utc::now(),
        }),
    ))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the housing router.
pub fn create_router(service: HousingCacheService, fetcher: Arc<dyn HousingFetcher>) -> Router {
    let state = HousingState::new(service, fetcher);

    Router::new()
        .route("/data", get(get_data))
        .route("/metadata", get(get_metadata))
        .route("/snapshots", get(get_snapshot_dates))
        .route("/snapshots/data", get(get_snapshot_data))
        .route("/cache", delete(clear_cache))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter_defaults() {
        let filter = parse_filter("indice", "general", None, None, None).unwrap();
        assert_eq!(filter.metric, HousingMetric::Index);
        assert_eq!(filter.tipo, HousingTipo::General);
        assert!(filter.ccaa.is_none());
    }

    #[test]
    fn test_parse_filter_rejects_unknown_metric() {
        let err = parse_filter("bogus", "general", None, None, None).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidFilter);
        assert!(err.details.is_some());
    }

    #[test]
    fn test_parse_filter_rejects_unknown_housing_type() {
        let err = parse_filter("indice", "chalet", None, None, None).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_parse_filter_rejects_inverted_year_range() {
        let err = parse_filter("indice", "general", None, Some(2024), Some(2020)).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
    }

    #[test]
    fn test_parse_filter_keeps_national_code() {
        let filter = parse_filter("var_anual", "nueva", Some("00"), None, None).unwrap();
        assert_eq!(filter.ccaa.as_deref(), Some("00"));
    }
}

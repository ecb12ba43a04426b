//! Air Quality Endpoints
//!
//! Stations come from the MITECO ICA last-hour feed; when the download
//! fails (or the caller forces it) the endpoints fall back to simulated
//! stations over the demo city list and flag the response accordingly.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::providers::miteco::{self, AirQualityProvider, POLLUTANTS};
use crate::types::{
    AirQualityHealthResponse, AirQualityStatsQuery, AirQualityStatsResponse, PollutantsResponse,
    Station, StationDetailResponse, StationLight, StationRows, StationsQuery, StationsResponse,
};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct AirQualityState {
    pub provider: Arc<AirQualityProvider>,
}

impl AirQualityState {
    pub fn new(provider: Arc<AirQualityProvider>) -> Self {
        Self { provider }
    }
}

/// Live stations when possible, simulated otherwise. The bool reports
/// whether the result is simulated.
async fn load_stations(state: &AirQualityState, forzar_mock: bool) -> (Vec<Station>, bool) {
    if forzar_mock {
        return (miteco::mock_stations(usize::MAX), true);
    }
    match state.provider.fetch_stations().await {
        Ok(stations) => (stations, false),
        Err(e) => {
            tracing::warn!(error = %e, "MITECO fetch failed, serving simulated stations");
            (miteco::mock_stations(usize::MAX), true)
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/air-quality/stations - Station list
#[utoipa::path(
    get,
    path = "/api/air-quality/stations",
    tag = "AirQuality",
    params(StationsQuery),
    responses(
        (status = 200, description = "Air-quality stations page", body = StationsResponse),
        (status = 400, description = "Unknown pollutant", body = ApiError),
    ),
)]
pub async fn get_stations(
    State(state): State<AirQualityState>,
    Query(q): Query<StationsQuery>,
) -> ApiResult<Json<StationsResponse>> {
    let description = pollutant_description(&q.contaminante)?;

    let (mut stations, is_mock) = load_stations(&state, q.forzar_mock).await;
    if q.solo_con_datos && !is_mock {
        stations.retain(|s| s.has_real_data);
    }

    let total = stations.len();
    let page: Vec<Station> = stations
        .into_iter()
        .skip(q.offset)
        .take(q.limite)
        .collect();

    let rows = if q.light {
        StationRows::Light(page.iter().map(StationLight::from).collect())
    } else {
        StationRows::Full(page)
    };

    Ok(Json(StationsResponse {
        success: true,
        count: rows.len(),
        total,
        offset: q.offset,
        limit: q.limite,
        has_more: q.offset + rows.len() < total,
        pollutant: q.contaminante,
        description,
        is_mock_data: is_mock,
        data_source: if is_mock {
            "Datos simulados".to_string()
        } else {
            "MITECO ICA".to_string()
        },
        light_mode: q.light,
        stations: rows,
    }))
}

/// GET /api/air-quality/station/{id} - One station by numeric id
#[utoipa::path(
    get,
    path = "/api/air-quality/station/{id}",
    tag = "AirQuality",
    params(
        ("id" = i64, Path, description = "Station id"),
    ),
    responses(
        (status = 200, description = "Station detail", body = StationDetailResponse),
        (status = 404, description = "Station not found", body = ApiError),
    ),
)]
pub async fn get_station(
    State(state): State<AirQualityState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<StationDetailResponse>> {
    let (stations, is_mock) = load_stations(&state, false).await;

    let data = stations
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| ApiError::station_not_found(id))?;

    Ok(Json(StationDetailResponse {
        success: true,
        data,
        is_mock_data: is_mock,
    }))
}

/// GET /api/air-quality/stats - Aggregate statistics for one pollutant
#[utoipa::path(
    get,
    path = "/api/air-quality/stats",
    tag = "AirQuality",
    params(AirQualityStatsQuery),
    responses(
        (status = 200, description = "Aggregate air-quality statistics", body = AirQualityStatsResponse),
        (status = 400, description = "Unknown pollutant", body = ApiError),
    ),
)]
pub async fn get_stats(
    State(state): State<AirQualityState>,
    Query(q): Query<AirQualityStatsQuery>,
) -> ApiResult<Json<AirQualityStatsResponse>> {
    pollutant_description(&q.contaminante)?;

    let (stations, is_mock) = load_stations(&state, q.forzar_mock).await;

    let concentrations: Vec<f64> = stations
        .iter()
        .filter_map(|s| s.last_measurement)
        .collect();

    let mut quality_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for station in &stations {
        *quality_distribution
            .entry(station.quality_text.clone())
            .or_default() += 1;
    }

    let (avg, min, max) = if concentrations.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = concentrations.iter().sum();
        let min = concentrations.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = concentrations
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        (sum / concentrations.len() as f64, min, max)
    };

    Ok(Json(AirQualityStatsResponse {
        pollutant: q.contaminante,
        total_stations: stations.len(),
        stations_with_data: concentrations.len(),
        avg_concentration: avg,
        min_concentration: min,
        max_concentration: max,
        quality_distribution,
        timestamp: Utc::now(),
        is_mock_data: is_mock,
    }))
}

/// GET /api/air-quality/pollutants - Supported pollutant catalog
#[utoipa::path(
    get,
    path = "/api/air-quality/pollutants",
    tag = "AirQuality",
    responses(
        (status = 200, description = "Pollutant catalog", body = PollutantsResponse),
    ),
)]
pub async fn get_pollutants() -> Json<PollutantsResponse> {
    Json(PollutantsResponse {
        pollutants: POLLUTANTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        units: "µg/m³".to_string(),
        source: "MITECO ICA".to_string(),
        update_frequency: "hourly".to_string(),
        real_data_available: true,
    })
}

/// GET /api/air-quality/health - MITECO feed reachability
#[utoipa::path(
    get,
    path = "/api/air-quality/health",
    tag = "AirQuality",
    responses(
        (status = 200, description = "Air-quality service health", body = AirQualityHealthResponse),
    ),
)]
pub async fn health(State(state): State<AirQualityState>) -> Json<AirQualityHealthResponse> {
    match state.provider.fetch_stations().await {
        Ok(stations) => {
            let with_data = stations.iter().filter(|s| s.has_real_data).count();
            Json(AirQualityHealthResponse {
                status: "healthy".to_string(),
                message: format!(
                    "Conectado a MITECO ICA. {} estaciones ({} con datos).",
                    stations.len(),
                    with_data,
                ),
                is_mock: false,
                stations: stations.len(),
                stations_with_data: with_data,
                timestamp: Utc::now(),
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "MITECO health check failed");
            Json(AirQualityHealthResponse {
                status: "degraded".to_string(),
                message: "MITECO no disponible. Usando datos simulados.".to_string(),
                is_mock: true,
                stations: 0,
                stations_with_data: 0,
                timestamp: Utc::now(),
            })
        }
    }
}

fn pollutant_description(contaminante: &str) -> ApiResult<String> {
    POLLUTANTS
        .get(contaminante)
        .map(|d| d.to_string())
        .ok_or_else(|| {
            ApiError::invalid_filter("contaminante", contaminante).with_details(
                serde_json::json!({
                    "valid_values": POLLUTANTS.keys().collect::<Vec<_>>(),
                }),
            )
        })
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the air-quality router.
pub fn create_router(provider: Arc<AirQualityProvider>) -> Router {
    let state = AirQualityState::new(provider);

    Router::new()
        .route("/stations", get(get_stations))
        .route("/station/:id", get(get_station))
        .route("/stats", get(get_stats))
        .route("/pollutants", get(get_pollutants))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pollutant_description_known() {
        assert!(pollutant_description("PM2.5").is_ok());
        assert!(pollutant_description("NO2").is_ok());
    }

    #[test]
    fn test_pollutant_description_unknown() {
        let err = pollutant_description("XYZ").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidFilter);
        assert!(err.details.is_some());
    }

    #[tokio::test]
    async fn test_health_degraded_when_feed_unreachable() {
        let provider = Arc::new(AirQualityProvider::new("http://127.0.0.1:9/ica.csv"));
        let Json(body) = health(State(AirQualityState::new(provider))).await;

        assert_eq!(body.status, "degraded");
        assert!(body.is_mock);
        assert_eq!(body.stations, 0);
    }
}

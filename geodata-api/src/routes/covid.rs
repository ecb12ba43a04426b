//! Covid Case Endpoints
//!
//! Direct reads over the `covid_cases` table: the full series, the
//! aggregated statistics and a filtered variant. The sentinel value
//! "todas" disables a name filter; name filters match as substrings.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    CovidDataResponse, CovidFilterQuery, CovidFilterResponse, CovidFiltersApplied,
    CovidStatsResponse,
};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct CovidState {
    pub db: DbClient,
}

impl CovidState {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/covid/data - Full covid case series
#[utoipa::path(
    get,
    path = "/api/covid/data",
    tag = "Covid",
    responses(
        (status = 200, description = "All covid case rows", body = CovidDataResponse),
    ),
)]
pub async fn get_data(State(state): State<CovidState>) -> ApiResult<Json<CovidDataResponse>> {
    let data = state.db.covid_list().await?;
    Ok(Json(CovidDataResponse { data }))
}

/// GET /api/covid/stats - Aggregated covid statistics
#[utoipa::path(
    get,
    path = "/api/covid/stats",
    tag = "Covid",
    responses(
        (status = 200, description = "Per-community, per-province and national totals", body = CovidStatsResponse),
    ),
)]
pub async fn get_stats(State(state): State<CovidState>) -> ApiResult<Json<CovidStatsResponse>> {
    let (por_comunidad, por_provincia, totales) = state.db.covid_stats().await?;
    Ok(Json(CovidStatsResponse {
        por_comunidad,
        por_provincia,
        totales,
    }))
}

/// GET /api/covid/filter - Filtered covid case rows
#[utoipa::path(
    get,
    path = "/api/covid/filter",
    tag = "Covid",
    params(CovidFilterQuery),
    responses(
        (status = 200, description = "Filtered covid case rows", body = CovidFilterResponse),
        (status = 400, description = "Invalid filter parameter", body = ApiError),
    ),
)]
pub async fn get_filtered(
    State(state): State<CovidState>,
    Query(q): Query<CovidFilterQuery>,
) -> ApiResult<Json<CovidFilterResponse>> {
    if let (Some(desde), Some(hasta)) = (&q.fecha_inicio, &q.fecha_fin) {
        if desde > hasta {
            return Err(ApiError::invalid_input(format!(
                "fecha_inicio ({}) must not exceed fecha_fin ({})",
                desde, hasta,
            )));
        }
    }

    let data = state.db.covid_filter(&q).await?;
    let total_casos: i64 = data.iter().map(|r| r.casos as i64).sum();

    Ok(Json(CovidFilterResponse {
        count: data.len(),
        total_casos,
        filters_applied: CovidFiltersApplied {
            comunidad: q.comunidad,
            provincia: q.provincia,
            fecha_inicio: q.fecha_inicio,
            fecha_fin: q.fecha_fin,
            min_casos: q.min_casos,
            max_casos: q.max_casos,
        },
        data,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the covid router.
pub fn create_router(db: DbClient) -> Router {
    let state = CovidState::new(db);

    Router::new()
        .route("/data", get(get_data))
        .route("/stats", get(get_stats))
        .route("/filter", get(get_filtered))
        .with_state(state)
}

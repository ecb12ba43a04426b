//! Election Result Endpoints
//!
//! 2023 congress results joined per municipality. The list endpoint
//! paginates and optionally serves a map-ready light shape; the party
//! endpoint aggregates one party's votes per community, validated
//! against the closed party list before any SQL is built.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::db::DbClient;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    ElectionRows, ElectionStatsResponse, ElectionsDataQuery, ElectionsDataResponse,
    MunicipalityLight, MunicipalityResponse, PartyResultsResponse, VALID_PARTIES,
};

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct ElectionsState {
    pub db: DbClient,
}

impl ElectionsState {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Whether rows remain past the returned page.
fn page_has_more(offset: i64, count: usize, total: i64) -> bool {
    (offset + count as i64) < total
}

fn validate_turnout(name: &str, value: Option<f64>) -> ApiResult<()> {
    if let Some(v) = value {
        if !(0.0..=100.0).contains(&v) {
            return Err(ApiError::invalid_range(name, 0, 100));
        }
    }
    Ok(())
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/elections/data - Filtered, paginated municipality results
#[utoipa::path(
    get,
    path = "/api/elections/data",
    tag = "Elections",
    params(ElectionsDataQuery),
    responses(
        (status = 200, description = "Municipality results page", body = ElectionsDataResponse),
        (status = 400, description = "Invalid filter parameter", body = ApiError),
    ),
)]
pub async fn get_data(
    State(state): State<ElectionsState>,
    Query(q): Query<ElectionsDataQuery>,
) -> ApiResult<Json<ElectionsDataResponse>> {
    validate_turnout("min_participacion", q.min_participacion)?;
    validate_turnout("max_participacion", q.max_participacion)?;
    if q.limit < 1 || q.limit > 10_000 {
        return Err(ApiError::invalid_range("limit", 1, 10_000));
    }
    if q.offset < 0 {
        return Err(ApiError::invalid_input("offset must not be negative"));
    }

    let (rows, total) = state.db.elections_list(&q).await?;

    let data = if q.light {
        ElectionRows::Light(rows.iter().map(MunicipalityLight::from).collect())
    } else {
        ElectionRows::Full(rows)
    };

    Ok(Json(ElectionsDataResponse {
        success: true,
        count: data.len(),
        total,
        offset: q.offset,
        limit: q.limit,
        has_more: page_has_more(q.offset, data.len(), total),
        light_mode: q.light,
        data,
    }))
}

/// GET /api/elections/municipality/{codigo_ine} - One municipality's results
#[utoipa::path(
    get,
    path = "/api/elections/municipality/{codigo_ine}",
    tag = "Elections",
    params(
        ("codigo_ine" = String, Path, description = "INE municipality code"),
    ),
    responses(
        (status = 200, description = "Municipality results", body = MunicipalityResponse),
        (status = 404, description = "Municipality not found", body = ApiError),
    ),
)]
pub async fn get_municipality(
    State(state): State<ElectionsState>,
    Path(codigo_ine): Path<String>,
) -> ApiResult<Json<MunicipalityResponse>> {
    let data = state
        .db
        .elections_municipality(&codigo_ine)
        .await?
        .ok_or_else(|| ApiError::municipality_not_found(&codigo_ine))?;

    Ok(Json(MunicipalityResponse {
        success: true,
        data,
    }))
}

/// GET /api/elections/stats - National aggregates and winner distribution
#[utoipa::path(
    get,
    path = "/api/elections/stats",
    tag = "Elections",
    responses(
        (status = 200, description = "National election statistics", body = ElectionStatsResponse),
    ),
)]
pub async fn get_stats(
    State(state): State<ElectionsState>,
) -> ApiResult<Json<ElectionStatsResponse>> {
    let (stats, distribucion_ganadores) = state.db.elections_stats().await?;
    Ok(Json(ElectionStatsResponse {
        success: true,
        stats,
        distribucion_ganadores,
    }))
}

/// GET /api/elections/party/{partido} - One party's votes per community
#[utoipa::path(
    get,
    path = "/api/elections/party/{partido}",
    tag = "Elections",
    params(
        ("partido" = String, Path, description = "Party column name (closed list)"),
    ),
    responses(
        (status = 200, description = "Per-community aggregation", body = PartyResultsResponse),
        (status = 400, description = "Unknown party", body = ApiError),
    ),
)]
pub async fn get_party(
    State(state): State<ElectionsState>,
    Path(partido): Path<String>,
) -> ApiResult<Json<PartyResultsResponse>> {
    let partido = partido.to_lowercase();
    let data = state.db.elections_party(&partido).await?;

    Ok(Json(PartyResultsResponse {
        success: true,
        partido,
        count: data.len(),
        data,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the elections router.
pub fn create_router(db: DbClient) -> Router {
    let state = ElectionsState::new(db);

    Router::new()
        .route("/data", get(get_data))
        .route("/municipality/:codigo_ine", get(get_municipality))
        .route("/stats", get(get_stats))
        .route("/party/:partido", get(get_party))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_turnout_bounds() {
        assert!(validate_turnout("min_participacion", None).is_ok());
        assert!(validate_turnout("min_participacion", Some(0.0)).is_ok());
        assert!(validate_turnout("min_participacion", Some(100.0)).is_ok());
        assert!(validate_turnout("min_participacion", Some(-1.0)).is_err());
        assert!(validate_turnout("max_participacion", Some(100.5)).is_err());
    }

    #[test]
    fn test_page_has_more() {
        assert!(page_has_more(0, 100, 250));
        assert!(page_has_more(100, 100, 250));
        assert!(!page_has_more(200, 50, 250));
        assert!(!page_has_more(0, 0, 0));
    }

    #[test]
    fn test_party_list_is_lowercase() {
        assert!(VALID_PARTIES
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
    }
}

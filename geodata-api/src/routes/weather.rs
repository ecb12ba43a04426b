//! Weather Endpoints
//!
//! Current weather over OpenWeather. With no API key configured, or
//! when the upstream call fails, the response carries simulated data
//! and says so in the `note` field.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::providers::openweather::{self, WeatherProvider};
use crate::types::{WeatherQuery, WeatherResponse};

const MOCK_NOTE: &str = "Datos simulados (sin clave de OpenWeather o upstream caído)";

// ============================================================================
// STATE
// ============================================================================

#[derive(Clone)]
pub struct WeatherState {
    pub provider: Arc<WeatherProvider>,
}

impl WeatherState {
    pub fn new(provider: Arc<WeatherProvider>) -> Self {
        Self { provider }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/weather/data - Current weather for one city or the demo list
#[utoipa::path(
    get,
    path = "/api/weather/data",
    tag = "Weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Current weather records", body = WeatherResponse),
    ),
)]
pub async fn get_data(
    State(state): State<WeatherState>,
    Query(q): Query<WeatherQuery>,
) -> ApiResult<Json<WeatherResponse>> {
    let (data, note) = match &q.city {
        Some(city) if state.provider.has_api_key() => match state.provider.fetch_city(city).await {
            Ok(record) => (vec![record], None),
            Err(e) => {
                tracing::warn!(city = %city, error = %e, "weather fetch failed, serving mock");
                (
                    vec![openweather::mock_weather_for_city(city)],
                    Some(MOCK_NOTE.to_string()),
                )
            }
        },
        Some(city) => (
            vec![openweather::mock_weather_for_city(city)],
            Some(MOCK_NOTE.to_string()),
        ),
        None if state.provider.has_api_key() => {
            match state.provider.fetch_demo_cities(q.limit).await {
                Ok(records) => (records, None),
                Err(e) => {
                    tracing::warn!(error = %e, "weather fetch failed, serving mock");
                    (
                        openweather::mock_weather(q.limit),
                        Some(MOCK_NOTE.to_string()),
                    )
                }
            }
        }
        None => (
            openweather::mock_weather(q.limit),
            Some(MOCK_NOTE.to_string()),
        ),
    };

    Ok(Json(WeatherResponse {
        count: data.len(),
        data,
        note,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the weather router.
pub fn create_router(provider: Arc<WeatherProvider>) -> Router {
    let state = WeatherState::new(provider);

    Router::new()
        .route("/data", get(get_data))
        .with_state(state)
}

//! REST API Routes Module
//!
//! Route handlers organized by dataset:
//! - Housing prices through the lazy-refresh cache (/api/housing/*)
//! - Covid cases (/api/covid/*)
//! - 2023 election results (/api/elections/*)
//! - Air quality (/api/air-quality/*)
//! - Current weather (/api/weather/*)
//! - Service banner, dataset catalog and health checks
//! - CORS support for browser-based map clients

pub mod air_quality;
pub mod covid;
pub mod elections;
pub mod housing;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use geodata_store::{HousingCacheService, HousingFetcher};

use crate::config::ApiConfig;
use crate::db::DbClient;
use crate::openapi::ApiDoc;
use crate::providers::{AirQualityProvider, WeatherProvider};

// Re-export route creation functions for convenience
pub use air_quality::create_router as air_quality_router;
pub use covid::create_router as covid_router;
pub use elections::create_router as elections_router;
pub use housing::create_router as housing_router;
pub use weather::create_router as weather_router;

// ============================================================================
// BANNER AND CATALOG
// ============================================================================

/// Service banner served at / and /api.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiBanner {
    pub message: String,
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// One dataset descriptor in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DatasetDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub endpoint: String,
    pub source: String,
}

/// Response for GET /api/datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DatasetsResponse {
    pub count: usize,
    pub datasets: Vec<DatasetDescriptor>,
}

/// GET / and GET /api - Service banner
#[utoipa::path(
    get,
    path = "/api",
    tag = "Meta",
    responses(
        (status = 200, description = "Service banner", body = ApiBanner),
    ),
)]
pub async fn banner() -> Json<ApiBanner> {
    Json(ApiBanner {
        message: "Geo-Data API running".to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /api/datasets - Dataset catalog
#[utoipa::path(
    get,
    path = "/api/datasets",
    tag = "Meta",
    responses(
        (status = 200, description = "Dataset catalog", body = DatasetsResponse),
    ),
)]
pub async fn datasets() -> Json<DatasetsResponse> {
    let datasets = vec![
        DatasetDescriptor {
            id: "covid".to_string(),
            name: "Casos COVID-19".to_string(),
            description: "Serie de casos confirmados por comunidad y provincia".to_string(),
            endpoint: "/api/covid/data".to_string(),
            source: "Ministerio de Sanidad".to_string(),
        },
        DatasetDescriptor {
            id: "weather".to_string(),
            name: "Meteorología actual".to_string(),
            description: "Tiempo actual en las principales ciudades".to_string(),
            endpoint: "/api/weather/data".to_string(),
            source: "OpenWeather".to_string(),
        },
        DatasetDescriptor {
            id: "elections".to_string(),
            name: "Elecciones Generales 2023".to_string(),
            description: "Resultados del Congreso por municipio".to_string(),
            endpoint: "/api/elections/data".to_string(),
            source: "Ministerio del Interior".to_string(),
        },
        DatasetDescriptor {
            id: "airquality".to_string(),
            name: "Calidad del aire".to_string(),
            description: "Índice de Calidad del Aire por estación, última hora".to_string(),
            endpoint: "/api/air-quality/stations".to_string(),
            source: "MITECO".to_string(),
        },
        DatasetDescriptor {
            id: "housing".to_string(),
            name: "Precios de vivienda (IPV)".to_string(),
            description: "Índice de Precios de Vivienda por comunidad y trimestre".to_string(),
            endpoint: "/api/housing/data".to_string(),
            source: "INE".to_string(),
        },
    ];

    Json(DatasetsResponse {
        count: datasets.len(),
        datasets,
    })
}

// ============================================================================
// HEALTH
// ============================================================================

/// Response for GET /health.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /health - Overall service health (database connectivity)
#[utoipa::path(
    get,
    path = "/health",
    tag = "Meta",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database is unreachable", body = HealthResponse),
    ),
)]
pub async fn health(State(db): State<DbClient>) -> impl IntoResponse {
    match db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                database: "connected".to_string(),
                timestamp: Utc::now(),
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    database: "unreachable".to_string(),
                    timestamp: Utc::now(),
                }),
            )
        }
    }
}

// ============================================================================
// OPENAPI ENDPOINTS
// ============================================================================

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: development mode, allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: production mode");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER ASSEMBLY
// ============================================================================

/// Create the complete API router.
///
/// - Housing cache endpoints under /api/housing/*
/// - Covid endpoints under /api/covid/*
/// - Elections endpoints under /api/elections/*
/// - Air quality under /api/air-quality/*
/// - Weather under /api/weather/*
/// - Banner at / and /api, catalog at /api/datasets
/// - Health at /health
/// - OpenAPI spec at /openapi.json
/// - Swagger UI at /swagger-ui (when the swagger-ui feature is enabled)
pub fn create_api_router(
    db: DbClient,
    housing_service: HousingCacheService,
    housing_fetcher: Arc<dyn HousingFetcher>,
    air_quality: Arc<AirQualityProvider>,
    weather: Arc<WeatherProvider>,
    config: &ApiConfig,
) -> Router {
    let api_routes = Router::new()
        .nest(
            "/housing",
            housing::create_router(housing_service, housing_fetcher),
        )
        .nest("/covid", covid::create_router(db.clone()))
        .nest("/elections", elections::create_router(db.clone()))
        .nest("/air-quality", air_quality::create_router(air_quality))
        .nest("/weather", weather::create_router(weather))
        .route("/", get(banner))
        .route("/datasets", get(datasets));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/", get(banner))
        .route("/health", get(health).with_state(db))
        .route("/openapi.json", get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()));
    }

    let cors = build_cors_layer(config);
    router
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_catalog_covers_all_endpoints() {
        let Json(response) = block_on(datasets());
        assert_eq!(response.count, 5);
        let ids: Vec<&str> = response.datasets.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["covid", "weather", "elections", "airquality", "housing"]);
        assert!(response
            .datasets
            .iter()
            .all(|d| d.endpoint.starts_with("/api/")));
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn test_cors_dev_mode_allows_all() {
        // No panic and a layer is produced for the permissive default.
        let _ = build_cors_layer(&ApiConfig::default());
    }

    #[test]
    fn test_cors_production_mode() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec!["https://geodata.example.org".to_string()];
        let _ = build_cors_layer(&config);
    }
}

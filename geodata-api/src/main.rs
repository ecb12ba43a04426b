//! Geo-Data API Server Entry Point
//!
//! Bootstraps configuration, the database pool, the housing cache
//! service and the upstream providers, then starts the Axum HTTP
//! server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;

use geodata_api::providers::{AirQualityProvider, IneHousingFetcher, WeatherProvider};
use geodata_api::telemetry::{init_tracing, TelemetryConfig};
use geodata_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, DbClient, DbConfig, PgHousingStore,
};
use geodata_store::HousingCacheService;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config).map_err(ApiError::internal_error)?;

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;

    let api_config = ApiConfig::from_env();

    // Housing cache over its own pool handle; same database.
    let housing_store = Arc::new(PgHousingStore::new(db_config.create_pool()?));
    let housing_service = HousingCacheService::with_ttl(housing_store, api_config.housing_ttl);
    let housing_fetcher = Arc::new(IneHousingFetcher::default());

    let air_quality = Arc::new(AirQualityProvider::default());
    let weather = Arc::new(WeatherProvider::from_config(&api_config));

    let app: Router = create_api_router(
        db,
        housing_service,
        housing_fetcher,
        air_quality,
        weather,
        &api_config,
    );

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Geo-Data API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("GEODATA_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("GEODATA_API_PORT").ok())
        .unwrap_or_else(|| "8000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}

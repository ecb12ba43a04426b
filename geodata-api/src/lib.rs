//! Geo-Data API
//!
//! REST API layer over Spanish open-data sets:
//! - Housing prices (INE IPV) through a lazy-refresh cache with an
//!   append-only snapshot ledger
//! - Covid case series
//! - 2023 congress election results per municipality
//! - Air quality (MITECO ICA)
//! - Current weather (OpenWeather)
//!
//! Built on Axum with deadpool-postgres for connection pooling. The
//! housing cache semantics live in `geodata-store`; this crate provides
//! the PostgreSQL store implementation, the upstream providers and the
//! HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod pg_store;
pub mod providers;
pub mod routes;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use pg_store::PgHousingStore;
pub use routes::create_api_router;

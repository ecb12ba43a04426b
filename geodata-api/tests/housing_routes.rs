//! Integration tests for the housing endpoints over an in-memory store.
//!
//! Exercises the whole HTTP path: query parsing, the lazy-refresh
//! protocol, pagination and the snapshot endpoints, without a database
//! or network.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use geodata_api::routes::housing;
use geodata_core::{NewHousingRow, Period};
use geodata_store::{
    FetchError, HousingCacheService, HousingFetcher, MemoryHousingStore,
};

// ============================================================================
// FIXTURES
// ============================================================================

fn row(periodo: &str, ccaa: &str, nombre: &str, valor: f64) -> NewHousingRow {
    let period = Period::parse(periodo).unwrap();
    NewHousingRow {
        periodo: periodo.to_string(),
        anio: period.anio,
        trimestre: period.trimestre,
        ccaa_codigo: ccaa.to_string(),
        ccaa_nombre: nombre.to_string(),
        tipo_vivienda: "General".to_string(),
        metrica: "Índice".to_string(),
        valor: Some(valor),
    }
}

fn seed_rows() -> Vec<NewHousingRow> {
    let mut rows = Vec::new();
    for anio in 2022..=2024 {
        for trimestre in 1..=4 {
            let periodo = format!("{}T{}", anio, trimestre);
            rows.push(row(&periodo, "00", "Nacional", 100.0 + anio as f64));
            rows.push(row(&periodo, "13", "Madrid, Comunidad de", 110.0 + anio as f64));
        }
    }
    rows
}

struct StaticFetcher(Vec<NewHousingRow>);

#[async_trait]
impl HousingFetcher for StaticFetcher {
    async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
        Ok(self.0.clone())
    }
}

struct FailingFetcher;

#[async_trait]
impl HousingFetcher for FailingFetcher {
    async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
        Err(FetchError::upstream("connection refused"))
    }
}

fn app(service: HousingCacheService, fetcher: Arc<dyn HousingFetcher>) -> Router {
    Router::new().nest("/api/housing", housing::create_router(service, fetcher))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_data_refreshes_empty_cache_from_upstream() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    let app = app(service, Arc::new(StaticFetcher(seed_rows())));

    let (status, body) = get_json(&app, "/api/housing/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "ine");
    assert!(body["total"].as_u64().unwrap() > 0);
    // Newest period first.
    assert_eq!(body["data"][0]["periodo"], "2024T4");
}

#[tokio::test]
async fn test_data_serves_fresh_cache() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    service.refresh(&seed_rows()).await.unwrap();

    // Upstream is down but the cache is fresh.
    let app = app(service, Arc::new(FailingFetcher));
    let (status, body) = get_json(&app, "/api/housing/data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "cache");
}

#[tokio::test]
async fn test_data_503_when_empty_and_upstream_down() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    let app = app(service, Arc::new(FailingFetcher));

    let (status, body) = get_json(&app, "/api/housing/data").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_data_rejects_unknown_metric() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    let app = app(service, Arc::new(StaticFetcher(seed_rows())));

    let (status, body) = get_json(&app, "/api/housing/data?metric=bogus").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FILTER");
    assert!(body["details"]["valid_values"].is_array());
}

#[tokio::test]
async fn test_data_region_and_pagination() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    service.refresh(&seed_rows()).await.unwrap();
    let app = app(service, Arc::new(FailingFetcher));

    let (status, body) =
        get_json(&app, "/api/housing/data?ccaa=13&limit=5&offset=5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 12);
    assert_eq!(body["count"], 5);
    assert_eq!(body["offset"], 5);
    for record in body["data"].as_array().unwrap() {
        assert_eq!(record["ccaa_codigo"], "13");
    }
}

#[tokio::test]
async fn test_snapshot_flow() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    service.refresh(&seed_rows()).await.unwrap();
    service
        .refresh(&[row("2025T1", "00", "Nacional", 130.0)])
        .await
        .unwrap();
    let app = app(service, Arc::new(FailingFetcher));

    // The first generation was frozen under one snapshot date.
    let (status, body) = get_json(&app, "/api/housing/snapshots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = get_json(&app, "/api/housing/snapshots/data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"].as_u64().unwrap() as usize, seed_rows().len());
    assert!(body["data"][0]["snapshot_date"].is_string());
}

#[tokio::test]
async fn test_clear_cache_preserves_snapshots() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    service.refresh(&seed_rows()).await.unwrap();
    service.refresh(&seed_rows()).await.unwrap();
    let app = app(service, Arc::new(FailingFetcher));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/housing/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["rows_removed"].as_u64().unwrap() as usize, seed_rows().len());

    let (status, body) = get_json(&app, "/api/housing/snapshots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (_, body) = get_json(&app, "/api/housing/health").await;
    assert_eq!(body["records"], 0);
    assert_eq!(body["fresh"], false);
}

#[tokio::test]
async fn test_metadata_reflects_cache() {
    let store = Arc::new(MemoryHousingStore::new());
    let service = HousingCacheService::new(store);
    let app = app(service.clone(), Arc::new(FailingFetcher));

    let (status, body) = get_json(&app, "/api/housing/metadata").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_available"], false);

    service.refresh(&seed_rows()).await.unwrap();
    let (_, body) = get_json(&app, "/api/housing/metadata").await;
    assert_eq!(body["data_available"], true);
    assert_eq!(body["periodo_min"], "2022T1");
    assert_eq!(body["periodo_max"], "2024T4");
    assert_eq!(body["ccaa_count"], 2);
}
